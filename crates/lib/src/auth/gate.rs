//! Authentication gate: drives the SSO handshake and decides whether chat input is open.
//!
//! Handshake (strictly sequential, each step awaited):
//! SDK present? → initialize → get context → hosted? → token (timeout) → verify.
//! Every failure ends in a `GateState` and a disabled input; nothing escapes as an error.

use super::backend::{AuthBackend, AuthCheck, BackendError, VerifyOutcome};
use super::identity::{Identity, UserProfile};
use super::sdk::{is_critical_error, request_token, SdkError, SsoSdk};
use crate::config::GateConfig;
use crate::input::{DisableReason, InputControl};
use crate::surface::Notice;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    /// No SSO SDK on this host. Terminal; input is never gated.
    SdkUnavailable,
    AwaitingContext,
    /// Context says we are not inside the container; SSO is skipped.
    NotHosted,
    AwaitingToken,
    AwaitingVerification,
    AuthenticatedRegistered,
    AuthenticatedUnregistered,
    Failed,
}

impl GateState {
    /// Whether this state leaves chat input open.
    pub fn permits_input(self) -> bool {
        matches!(
            self,
            GateState::AuthenticatedRegistered | GateState::SdkUnavailable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateState::Uninitialized => "uninitialized",
            GateState::SdkUnavailable => "sdk-unavailable",
            GateState::AwaitingContext => "awaiting-context",
            GateState::NotHosted => "not-hosted",
            GateState::AwaitingToken => "awaiting-token",
            GateState::AwaitingVerification => "awaiting-verification",
            GateState::AuthenticatedRegistered => "authenticated-registered",
            GateState::AuthenticatedUnregistered => "authenticated-unregistered",
            GateState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the gate ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateFailure {
    #[error("SDK initialization failed: {0}")]
    SdkInit(SdkError),
    #[error("host context unavailable: {0}")]
    ContextUnavailable(SdkError),
    #[error("SSO token request failed: {0}")]
    TokenRequest(SdkError),
    #[error("token verification failed: {error}")]
    Verification { status: Option<u16>, error: String },
    #[error("user not registered ({status}): {error}")]
    NotRegistered { status: u16, error: String },
}

impl GateFailure {
    /// Critical failures send the surface to the error route (when hosted).
    pub fn is_critical(&self) -> bool {
        match self {
            GateFailure::TokenRequest(e) => e.is_critical(),
            GateFailure::Verification { error, .. } => is_critical_error("", error),
            _ => false,
        }
    }
}

/// Broadcast to subscribers on every terminal transition.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    Authenticated(Identity),
    Failed(GateFailure),
    LoggedOut,
}

#[derive(Debug, Clone)]
pub struct GateSettings {
    pub token_timeout: Duration,
    pub watchdog_interval: Duration,
    pub error_route: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self::from(&GateConfig::default())
    }
}

impl From<&GateConfig> for GateSettings {
    fn from(c: &GateConfig) -> Self {
        Self {
            token_timeout: c.token_timeout(),
            watchdog_interval: c.watchdog_interval(),
            error_route: c.error_route.clone(),
        }
    }
}

/// Point-in-time view of the gate.
#[derive(Debug, Clone)]
pub struct GateStatus {
    pub state: GateState,
    pub identity: Option<Identity>,
    pub has_token: bool,
    pub hosted: bool,
    pub last_failure: Option<GateFailure>,
}

struct GateInner {
    state: GateState,
    identity: Option<Identity>,
    token: Option<String>,
    hosted: bool,
    notice_visible: bool,
    last_failure: Option<GateFailure>,
    started: bool,
}

pub struct AuthGate {
    sdk: Option<Arc<dyn SsoSdk>>,
    backend: Arc<dyn AuthBackend>,
    input: Arc<InputControl>,
    settings: GateSettings,
    inner: Mutex<GateInner>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthGate {
    /// `sdk: None` means the host has no SSO SDK (standalone mode).
    pub fn new(
        sdk: Option<Arc<dyn SsoSdk>>,
        backend: Arc<dyn AuthBackend>,
        input: Arc<InputControl>,
        settings: GateSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sdk,
            backend,
            input,
            settings,
            inner: Mutex::new(GateInner {
                state: GateState::Uninitialized,
                identity: None,
                token: None,
                hosted: false,
                notice_visible: false,
                last_failure: None,
                started: false,
            }),
            events,
        }
    }

    fn inner(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> GateState {
        self.inner().state
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner().identity.clone()
    }

    pub fn status(&self) -> GateStatus {
        let g = self.inner();
        GateStatus {
            state: g.state,
            identity: g.identity.clone(),
            has_token: g.token.is_some(),
            hosted: g.hosted,
            last_failure: g.last_failure.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn set_state(&self, state: GateState) {
        let mut g = self.inner();
        if g.state != state {
            log::debug!("auth gate: {} -> {}", g.state, state);
            g.state = state;
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Run the handshake once. Later calls return the current state without repeating it.
    pub async fn initialize(&self) -> GateState {
        {
            let mut g = self.inner();
            if g.started {
                return g.state;
            }
            g.started = true;
        }

        let Some(sdk) = self.sdk.clone() else {
            log::warn!("SSO SDK not available, running standalone");
            self.set_state(GateState::SdkUnavailable);
            self.enable_input();
            return GateState::SdkUnavailable;
        };

        // Closed until proven registered.
        self.disable_input().await;

        if let Err(e) = sdk.initialize().await {
            return self.fail(GateFailure::SdkInit(e)).await;
        }
        self.set_state(GateState::AwaitingContext);

        let context = match sdk.get_context().await {
            Ok(c) => c,
            Err(e) => return self.fail(GateFailure::ContextUnavailable(e)).await,
        };
        if !context.is_hosted() {
            log::info!("not running inside the SSO host; skipping silent auth");
            self.set_state(GateState::NotHosted);
            return GateState::NotHosted;
        }
        self.inner().hosted = true;

        self.set_state(GateState::AwaitingToken);
        let token = match request_token(sdk.as_ref(), self.settings.token_timeout).await {
            Ok(t) if !t.trim().is_empty() => t,
            Ok(_) => {
                let e = SdkError::new("EmptyToken", "SDK returned an empty token");
                return self.fail(GateFailure::TokenRequest(e)).await;
            }
            Err(e) => return self.fail(GateFailure::TokenRequest(e)).await,
        };
        log::info!("SSO token received, verifying with backend");

        let state = self.verify_token(&token).await;
        if matches!(
            state,
            GateState::AuthenticatedRegistered | GateState::AuthenticatedUnregistered
        ) {
            self.check_auth_status().await;
        }
        state
    }

    /// Exchange `token` with the backend and move to the matching state.
    pub async fn verify_token(&self, token: &str) -> GateState {
        self.set_state(GateState::AwaitingVerification);
        let outcome = match self.backend.verify(token).await {
            Ok(o) => o,
            Err(e) => {
                return self
                    .fail(GateFailure::Verification {
                        status: None,
                        error: e.to_string(),
                    })
                    .await
            }
        };
        match outcome {
            VerifyOutcome::Verified { user, registration } => {
                let identity = Identity::new(user, registration);
                {
                    let mut g = self.inner();
                    g.token = Some(token.to_string());
                    g.identity = Some(identity.clone());
                    g.last_failure = None;
                }
                self.input.surface().show_identity(&identity);
                if identity.is_registered() {
                    log::info!("authenticated as {} (registered)", identity.header_label());
                    self.set_state(GateState::AuthenticatedRegistered);
                    self.hide_notice();
                    self.enable_input();
                } else {
                    log::warn!(
                        "authenticated as {} but not registered downstream",
                        identity.display_name()
                    );
                    self.set_state(GateState::AuthenticatedUnregistered);
                    self.disable_input().await;
                    self.show_notice();
                }
                let state = self.state();
                self.emit(AuthEvent::Authenticated(identity));
                state
            }
            VerifyOutcome::Rejected { status, error } => {
                let registration_related = status == 401
                    || status == 403
                    || error.contains("AD")
                    || error.contains("indici");
                if registration_related && !is_critical_error("", &error) {
                    self.fail(GateFailure::NotRegistered { status, error }).await
                } else {
                    self.fail(GateFailure::Verification {
                        status: Some(status),
                        error,
                    })
                    .await
                }
            }
        }
    }

    async fn fail(&self, failure: GateFailure) -> GateState {
        log::error!("auth gate: {}", failure);
        let hosted = {
            let mut g = self.inner();
            g.state = GateState::Failed;
            g.identity = None;
            g.last_failure = Some(failure.clone());
            g.hosted
        };
        self.disable_input().await;
        if matches!(failure, GateFailure::NotRegistered { .. }) {
            self.show_notice();
        } else if hosted && failure.is_critical() {
            log::warn!("critical auth failure, redirecting to {}", self.settings.error_route);
            self.input.surface().redirect(&self.settings.error_route);
        }
        self.emit(AuthEvent::Failed(failure));
        GateState::Failed
    }

    pub fn enable_input(&self) {
        self.input.enable(DisableReason::Auth);
    }

    pub async fn disable_input(&self) {
        self.input.disable(DisableReason::Auth).await;
    }

    fn show_notice(&self) {
        let first = {
            let mut g = self.inner();
            !std::mem::replace(&mut g.notice_visible, true)
        };
        if first {
            self.input.surface().show_notice(&Notice::NotRegistered);
        }
    }

    fn hide_notice(&self) {
        let was_visible = std::mem::replace(&mut self.inner().notice_visible, false);
        if was_visible {
            self.input.surface().dismiss_notice(&Notice::NotRegistered);
        }
    }

    /// Close the "not registered" notice. Input stays as the gate state dictates.
    pub fn dismiss_notice(&self) {
        self.hide_notice();
    }

    /// Ask the backend whether the session is still authenticated; redirect if not.
    pub async fn check_auth_status(&self) -> bool {
        let token = self.inner().token.clone();
        match self.backend.auth_check(token.as_deref()).await {
            Ok(AuthCheck::Ok) => true,
            Ok(AuthCheck::Unauthenticated) => {
                log::warn!("auth check rejected, redirecting to {}", self.settings.error_route);
                self.input.surface().redirect(&self.settings.error_route);
                false
            }
            Err(e) => {
                log::warn!("auth check failed: {}", e);
                false
            }
        }
    }

    /// Diagnostic token exchange (`/auth/token-exchange`); does not change gate state.
    pub async fn exchange_token(&self, token: &str) -> Result<UserProfile, BackendError> {
        self.backend.exchange(token).await
    }

    /// Tell the backend to drop the session, then clear local identity whatever it said.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            log::warn!("logout request failed, clearing local session anyway: {}", e);
        }
        {
            let mut g = self.inner();
            g.identity = None;
            g.token = None;
            g.last_failure = None;
            g.state = GateState::Uninitialized;
            g.started = false;
        }
        self.input.surface().clear_identity();
        self.hide_notice();
        self.disable_input().await;
        self.emit(AuthEvent::LoggedOut);
    }

    /// One watchdog pass: re-derive the auth disable from the state and re-render if the
    /// surface drifted. Returns true when the surface had to be corrected.
    pub fn enforce(&self) -> bool {
        let permits = self.state().permits_input();
        self.input.set_reason(DisableReason::Auth, !permits);
        self.input.reconcile()
    }

    /// Run `enforce` every watchdog interval until the gate is dropped or the task aborted.
    pub fn spawn_watchdog(self: &Arc<Self>) -> JoinHandle<()> {
        let gate: Weak<Self> = Arc::downgrade(self);
        let period = self.settings.watchdog_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(gate) = gate.upgrade() else {
                    break;
                };
                if gate.enforce() {
                    log::debug!("watchdog corrected input state ({})", gate.state());
                }
            }
        })
    }
}
