//! Integration tests: the auth gate against a mock backend on a local port.

mod common;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use common::{auth_routes, auth_server, dead_url, new_gate, serve, settings};
use reportchat::auth::{
    AuthBackend, AuthCheck, AuthEvent, BackendError, GateFailure, GateState, HttpAuthBackend,
    SsoSdk, StaticSdk, UserProfile, VerifyOutcome,
};
use reportchat::input::DisableReason;
use reportchat::surface::InputSurface;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn hosted_sdk(token: Option<&str>) -> Option<Arc<dyn SsoSdk>> {
    Some(Arc::new(StaticSdk::new(
        Some("Teams".to_string()),
        token.map(str::to_string),
    )))
}

fn http(base: &str) -> Arc<dyn AuthBackend> {
    Arc::new(HttpAuthBackend::new(base))
}

fn registered_user() -> Value {
    json!({
        "user": { "displayName": "A. Smith" },
        "ad_data": { "practices": [ { "practiceName": "Clinic A", "isPrimary": true } ] }
    })
}

#[tokio::test]
async fn missing_sdk_leaves_input_enabled() {
    let (surface, input, gate) = new_gate(None, http(&dead_url()), settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::SdkUnavailable);
    assert!(surface.input_enabled());
    assert!(!input.is_disabled_by(DisableReason::Auth));
    assert!(surface.redirects().is_empty());

    // The watchdog leaves a permitted state alone.
    assert!(!gate.enforce());
    assert!(surface.input_enabled());
}

#[tokio::test]
async fn registered_user_enables_input_with_primary_practice() {
    let (base, seen) = auth_server(
        200,
        json!({
            "user": { "displayName": "A. Smith" },
            "ad_data": { "practices": [ { "practiceName": "Clinic A", "isPrimary": true } ] }
        }),
    )
    .await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("sso-token")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    let mut events = gate.subscribe();

    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
    assert!(surface.input_enabled());
    assert!(!surface.overlay.load(std::sync::atomic::Ordering::SeqCst));
    assert!(surface.redirects().is_empty());

    let identity = gate.identity().expect("identity");
    assert_eq!(identity.display_name(), "A. Smith");
    let registration = identity.registration.as_ref().expect("registration");
    assert_eq!(registration.practice_name(), "Clinic A");
    assert_eq!(identity.header_label(), "A. Smith (User) - Clinic A");
    assert!(surface.identity.lock().unwrap().is_some());

    let headers = seen.lock().unwrap().clone();
    assert_eq!(
        headers,
        vec![(
            Some("sso-token".to_string()),
            Some("Bearer sso-token".to_string())
        )]
    );
    assert!(matches!(events.try_recv(), Ok(AuthEvent::Authenticated(_))));
    assert!(gate.status().has_token);
}

#[tokio::test]
async fn unregistered_user_sees_notice_exactly_once() {
    let (base, _) = auth_server(200, json!({ "user": { "displayName": "B. Jones" } })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );

    assert_eq!(gate.initialize().await, GateState::AuthenticatedUnregistered);
    assert_eq!(gate.verify_token("tok").await, GateState::AuthenticatedUnregistered);
    assert_eq!(gate.verify_token("tok").await, GateState::AuthenticatedUnregistered);
    // A repeated initialize is a no-op.
    assert_eq!(gate.initialize().await, GateState::AuthenticatedUnregistered);

    assert_eq!(surface.notices(), 1);
    assert!(!surface.input_enabled());
    let p = surface.presentation.lock().unwrap().clone().expect("presentation");
    assert_eq!(p.placeholder, "User not registered - contact administrator");
    assert_eq!(p.send_title, "Chat disabled - user not registered");
    assert!(surface.redirects().is_empty());
}

#[tokio::test]
async fn dismissing_notice_keeps_input_disabled() {
    let (base, _) = auth_server(200, json!({ "user": { "displayName": "B. Jones" } })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    gate.initialize().await;
    gate.dismiss_notice();
    assert_eq!(surface.dismissed.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(!surface.input_enabled());
}

#[tokio::test]
async fn critical_token_failure_redirects_to_error_route() {
    let (surface, _, gate) = new_gate(hosted_sdk(None), http(&dead_url()), settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert_eq!(surface.redirects(), vec!["/auth/error".to_string()]);
    assert!(!surface.input_enabled());
    assert!(matches!(
        gate.status().last_failure,
        Some(GateFailure::TokenRequest(ref e)) if e.code == "InteractionRequired"
    ));
}

#[tokio::test]
async fn non_critical_verification_failure_disables_without_redirect() {
    let (base, _) = auth_server(500, json!({ "error": "database unavailable" })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert!(surface.redirects().is_empty());
    assert!(!surface.input_enabled());
    assert_eq!(surface.notices(), 0);
    assert!(matches!(
        gate.status().last_failure,
        Some(GateFailure::Verification { status: Some(500), .. })
    ));
}

#[tokio::test]
async fn forbidden_not_registered_shows_notice_without_redirect() {
    let (base, _) = auth_server(403, json!({ "error": "not registered" })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert!(!surface.input_enabled());
    assert_eq!(surface.notices(), 1);
    assert!(surface.redirects().is_empty());
    assert!(gate.identity().is_none());
    match gate.status().last_failure {
        Some(GateFailure::NotRegistered { status, error }) => {
            assert_eq!(status, 403);
            assert_eq!(error, "not registered");
        }
        other => panic!("unexpected failure {:?}", other),
    }
}

#[tokio::test]
async fn indici_rejection_shows_notice_whatever_the_status() {
    let (base, _) = auth_server(500, json!({ "error": "User not found in indici" })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert!(!surface.input_enabled());
    assert_eq!(surface.notices(), 1);
    assert!(surface.redirects().is_empty());
    assert!(matches!(
        gate.status().last_failure,
        Some(GateFailure::NotRegistered { status: 500, .. })
    ));

    let (base, _) = auth_server(502, json!({ "error": "AD lookup failed" })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert_eq!(surface.notices(), 1);
    assert!(matches!(
        gate.status().last_failure,
        Some(GateFailure::NotRegistered { status: 502, .. })
    ));
}

#[tokio::test]
async fn critical_message_in_rejection_redirects() {
    let (base, _) = auth_server(401, json!({ "error": "TokenExpired: sign in again" })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );
    assert_eq!(gate.initialize().await, GateState::Failed);
    assert_eq!(surface.redirects(), vec!["/auth/error".to_string()]);
    assert_eq!(surface.notices(), 0);
}

#[tokio::test]
async fn standalone_context_skips_sso() {
    let (base, seen) = auth_server(200, json!({ "user": {} })).await;
    let sdk: Arc<dyn SsoSdk> = Arc::new(StaticSdk::new(None, Some("tok".into())));
    let (surface, _, gate) = new_gate(Some(sdk), http(&base), settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::NotHosted);
    assert!(seen.lock().unwrap().is_empty());
    assert!(!surface.input_enabled());
    assert!(surface.redirects().is_empty());
}

/// Verifies over HTTP but cannot reach the server on logout.
struct OfflineLogout {
    online: HttpAuthBackend,
    offline: HttpAuthBackend,
}

#[async_trait]
impl AuthBackend for OfflineLogout {
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, BackendError> {
        self.online.verify(token).await
    }
    async fn exchange(&self, token: &str) -> Result<UserProfile, BackendError> {
        self.online.exchange(token).await
    }
    async fn logout(&self) -> Result<(), BackendError> {
        self.offline.logout().await
    }
    async fn auth_check(&self, token: Option<&str>) -> Result<AuthCheck, BackendError> {
        self.online.auth_check(token).await
    }
}

#[tokio::test]
async fn logout_clears_identity_when_network_fails() {
    let (base, _) = auth_server(
        200,
        json!({
            "user": { "displayName": "A. Smith" },
            "ad_data": { "practices": [ { "practiceName": "Clinic A", "isPrimary": true } ] }
        }),
    )
    .await;
    let backend = Arc::new(OfflineLogout {
        online: HttpAuthBackend::new(base),
        offline: HttpAuthBackend::new(dead_url()),
    });
    let (surface, _, gate) = new_gate(hosted_sdk(Some("tok")), backend, settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
    let mut events = gate.subscribe();

    gate.logout().await;

    assert!(gate.identity().is_none());
    assert!(!gate.status().has_token);
    assert_eq!(gate.state(), GateState::Uninitialized);
    assert!(surface.identity.lock().unwrap().is_none());
    assert!(!surface.input_enabled());
    assert!(matches!(events.try_recv(), Ok(AuthEvent::LoggedOut)));

    // The handshake can run again after logout.
    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
}

#[tokio::test]
async fn watchdog_redisables_externally_enabled_input() {
    let (base, _) = auth_server(200, json!({ "user": { "displayName": "B. Jones" } })).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_millis(40)),
    );
    assert_eq!(gate.initialize().await, GateState::AuthenticatedUnregistered);
    let watchdog = gate.spawn_watchdog();

    surface.tamper(true);
    assert!(surface.input_enabled());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!surface.input_enabled());

    watchdog.abort();
}

#[tokio::test]
async fn token_exchange_returns_user() {
    let (base, _) = auth_server(200, json!({})).await;
    let router = axum::Router::new().route(
        "/auth/token-exchange",
        axum::routing::post(|| async {
            axum::Json(json!({ "user": { "displayName": "A. Smith", "mail": "a@clinic.test" } }))
        }),
    );
    let exchange_base = common::serve(router).await;
    let (_, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&exchange_base),
        settings(Duration::from_secs(5)),
    );
    let user = gate.exchange_token("tok").await.expect("exchange");
    assert_eq!(user.display_name.as_deref(), Some("A. Smith"));
    assert_eq!(user.mail.as_deref(), Some("a@clinic.test"));
    assert_eq!(gate.state(), GateState::Uninitialized);

    // Unknown route on the verify-only server is an error, not a panic.
    let (_, _, other) = new_gate(None, http(&base), settings(Duration::from_secs(5)));
    assert!(other.exchange_token("tok").await.is_err());
}

#[tokio::test]
async fn auth_check_under_path_prefix_keeps_session() {
    let (routes, _) = auth_routes(200, registered_user());
    let routes = routes.route("/teams", get(|| async { "ok" }));
    let base = format!("{}/app", serve(Router::new().nest("/app", routes)).await);
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );

    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
    assert!(gate.check_auth_status().await);
    assert!(surface.redirects().is_empty());
    assert!(surface.input_enabled());
}

#[tokio::test]
async fn unauthorized_auth_check_redirects_to_error_route() {
    let (routes, _) = auth_routes(200, registered_user());
    let routes = routes.route("/teams", get(|| async { StatusCode::UNAUTHORIZED }));
    let base = serve(routes).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );

    // initialize runs the auth check once the token is verified.
    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
    assert_eq!(surface.redirects(), vec!["/auth/error".to_string()]);

    assert!(!gate.check_auth_status().await);
    assert_eq!(surface.redirects().len(), 2);
}

#[tokio::test]
async fn redirected_auth_check_redirects_to_error_route() {
    let (routes, _) = auth_routes(200, registered_user());
    let routes = routes
        .route(
            "/teams",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/login")]) }),
        )
        .route("/login", get(|| async { "sign in" }));
    let base = serve(routes).await;
    let (surface, _, gate) = new_gate(
        hosted_sdk(Some("tok")),
        http(&base),
        settings(Duration::from_secs(5)),
    );

    assert_eq!(gate.initialize().await, GateState::AuthenticatedRegistered);
    assert_eq!(surface.redirects(), vec!["/auth/error".to_string()]);
    assert!(!gate.check_auth_status().await);
}

#[tokio::test]
async fn unreachable_auth_check_is_ignored() {
    let (surface, _, gate) = new_gate(None, http(&dead_url()), settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::SdkUnavailable);

    assert!(!gate.check_auth_status().await);
    assert!(surface.redirects().is_empty());
    assert!(surface.input_enabled());
}

#[tokio::test]
async fn standalone_session_reopens_after_logout() {
    let (base, _) = auth_server(200, json!({})).await;
    let (surface, _, gate) = new_gate(None, http(&base), settings(Duration::from_secs(5)));
    assert_eq!(gate.initialize().await, GateState::SdkUnavailable);

    gate.logout().await;
    assert_eq!(gate.state(), GateState::Uninitialized);
    assert!(!surface.input_enabled());

    assert_eq!(gate.initialize().await, GateState::SdkUnavailable);
    assert!(surface.input_enabled());
}
