//! Backend auth endpoints: token verification, token exchange, logout and the session auth check.

use super::identity::{RegistrationData, UserProfile};
use async_trait::async_trait;
use serde::Deserialize;

const TOKEN_HEADER: &str = "X-Teams-Token";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("auth backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("auth backend api error: {0}")]
    Api(String),
}

/// Result of `POST /auth/verify` that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// 2xx with `{ user, ad_data? }`.
    Verified {
        user: UserProfile,
        registration: Option<RegistrationData>,
    },
    /// Non-2xx with `{ error }`.
    Rejected { status: u16, error: String },
}

/// Result of `GET /teams?auth_check=true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCheck {
    Ok,
    /// 401, or the server redirected us away (e.g. to a sign-in page).
    Unauthenticated,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, BackendError>;

    /// Exchange an SSO token for the directory profile (diagnostic path).
    async fn exchange(&self, token: &str) -> Result<UserProfile, BackendError>;

    async fn logout(&self) -> Result<(), BackendError>;

    async fn auth_check(&self, token: Option<&str>) -> Result<AuthCheck, BackendError>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    user: UserProfile,
    #[serde(default)]
    ad_data: Option<RegistrationData>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn error_text(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: Some(serde_json::Value::String(s)),
        }) => s,
        Ok(ErrorResponse { error: Some(v) }) => v.to_string(),
        _ => "Failed to parse error response".to_string(),
    }
}

/// HTTP client for the auth endpoints. Keeps cookies so the session set by
/// `/auth/verify` is sent with later calls.
#[derive(Clone)]
pub struct HttpAuthBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("auth client without cookie store: {}", e);
                reqwest::Client::new()
            });
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    /// POST /auth/verify: token in the bearer header, the custom header, and the body.
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, BackendError> {
        let res = self
            .client
            .post(self.url("/auth/verify"))
            .bearer_auth(token)
            .header(TOKEN_HEADER, token)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;
        let status = res.status();
        if status.is_success() {
            let data: VerifyResponse = res.json().await?;
            return Ok(VerifyOutcome::Verified {
                user: data.user,
                registration: data.ad_data,
            });
        }
        let body = res.text().await.unwrap_or_default();
        Ok(VerifyOutcome::Rejected {
            status: status.as_u16(),
            error: error_text(&body),
        })
    }

    /// POST /auth/token-exchange: returns `user` from the response.
    async fn exchange(&self, token: &str) -> Result<UserProfile, BackendError> {
        let res = self
            .client
            .post(self.url("/auth/token-exchange"))
            .header(TOKEN_HEADER, token)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("{} {}", status, error_text(&body))));
        }
        let data: VerifyResponse = res.json().await?;
        Ok(data.user)
    }

    /// POST /auth/logout.
    async fn logout(&self) -> Result<(), BackendError> {
        let res = self
            .client
            .post(self.url("/auth/logout"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }

    /// GET /teams?auth_check=true.
    async fn auth_check(&self, token: Option<&str>) -> Result<AuthCheck, BackendError> {
        let mut req = self.client.get(self.url("/teams?auth_check=true"));
        if let Some(t) = token {
            req = req.bearer_auth(t).header(TOKEN_HEADER, t);
        }
        let request = req.build()?;
        let requested = request.url().clone();
        let res = self.client.execute(request).await?;
        // Redirects are followed; a different final URL means the session was bounced.
        let redirected = res.url() != &requested;
        if res.status() == reqwest::StatusCode::UNAUTHORIZED || redirected {
            return Ok(AuthCheck::Unauthenticated);
        }
        Ok(AuthCheck::Ok)
    }
}
