//! SSO SDK seam: the host container's initialize / get-context / get-auth-token calls.
//!
//! The token call is callback-style (the SDK invokes success or failure at some later
//! point, or never). `request_token` turns it into a future bounded by a timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::oneshot;

/// Failure codes that mean the user has to act (consent, sign-in) before SSO can work.
pub const CRITICAL_ERROR_CODES: &[&str] = &[
    "ConsentRequired",
    "UiRequired",
    "InteractionRequired",
    "TokenExpired",
    "InvalidGrant",
];

/// Error reported by the SDK (or by the wrapper on timeout / dropped callback).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct SdkError {
    pub code: String,
    pub message: String,
}

impl SdkError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the code or message mentions one of `CRITICAL_ERROR_CODES`.
    pub fn is_critical(&self) -> bool {
        is_critical_error(&self.code, &self.message)
    }
}

/// Substring match of the critical codes against an error code and message.
pub fn is_critical_error(code: &str, message: &str) -> bool {
    CRITICAL_ERROR_CODES
        .iter()
        .any(|c| code.contains(c) || message.contains(c))
}

/// Subset of the SDK context we read: `app.host` tells whether we run inside the container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostContext {
    #[serde(default)]
    pub app: Option<HostApp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostApp {
    #[serde(default)]
    pub host: Option<serde_json::Value>,
}

impl HostContext {
    pub fn hosted(host: impl Into<String>) -> Self {
        Self {
            app: Some(HostApp {
                host: Some(serde_json::json!({ "name": host.into() })),
            }),
        }
    }

    pub fn standalone() -> Self {
        Self::default()
    }

    pub fn is_hosted(&self) -> bool {
        matches!(
            self.app.as_ref().and_then(|a| a.host.as_ref()),
            Some(v) if !v.is_null()
        )
    }
}

/// One pending token request. The SDK calls exactly one of `succeed` / `fail`;
/// dropping it without calling either counts as a failure.
pub struct AuthTokenRequest {
    tx: oneshot::Sender<Result<String, SdkError>>,
}

impl AuthTokenRequest {
    pub fn succeed(self, token: impl Into<String>) {
        let _ = self.tx.send(Ok(token.into()));
    }

    pub fn fail(self, error: SdkError) {
        let _ = self.tx.send(Err(error));
    }
}

#[async_trait]
pub trait SsoSdk: Send + Sync {
    async fn initialize(&self) -> Result<(), SdkError>;

    async fn get_context(&self) -> Result<HostContext, SdkError>;

    /// Start a silent token request; the outcome is delivered through `request`.
    fn get_auth_token(&self, request: AuthTokenRequest);
}

/// Ask the SDK for a token and wait at most `timeout` for its callback.
pub async fn request_token(sdk: &dyn SsoSdk, timeout: Duration) -> Result<String, SdkError> {
    let (tx, rx) = oneshot::channel();
    sdk.get_auth_token(AuthTokenRequest { tx });
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(SdkError::new(
            "CallbackDropped",
            "SDK dropped the token request without answering",
        )),
        Err(_) => Err(SdkError::new(
            "Timeout",
            format!("no token callback within {:?}", timeout),
        )),
    }
}

/// SDK with a fixed host and token, for hosts without a real container (CLI, tests).
pub struct StaticSdk {
    host: Option<String>,
    token: Option<String>,
}

impl StaticSdk {
    /// `host: None` reports a standalone context; `token: None` fails the token request
    /// with `InteractionRequired`.
    pub fn new(host: Option<String>, token: Option<String>) -> Self {
        Self { host, token }
    }
}

#[async_trait]
impl SsoSdk for StaticSdk {
    async fn initialize(&self) -> Result<(), SdkError> {
        Ok(())
    }

    async fn get_context(&self) -> Result<HostContext, SdkError> {
        Ok(match &self.host {
            Some(h) => HostContext::hosted(h.clone()),
            None => HostContext::standalone(),
        })
    }

    fn get_auth_token(&self, request: AuthTokenRequest) {
        match &self.token {
            Some(t) => request.succeed(t.clone()),
            None => request.fail(SdkError::new(
                "InteractionRequired",
                "no SSO token configured",
            )),
        }
    }
}
