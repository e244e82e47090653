//! Single sign-on: SDK seam, backend verification, identity, and the input gate.

mod backend;
mod gate;
mod identity;
mod sdk;

pub use backend::{AuthBackend, AuthCheck, BackendError, HttpAuthBackend, VerifyOutcome};
pub use gate::{AuthEvent, AuthGate, GateFailure, GateSettings, GateState, GateStatus};
pub use identity::{Identity, Practice, RegistrationData, UserProfile};
pub use sdk::{
    is_critical_error, request_token, AuthTokenRequest, HostApp, HostContext, SdkError, SsoSdk,
    StaticSdk, CRITICAL_ERROR_CODES,
};
