//! Shared fixtures for the integration tests: a recording surface, a recording chat view,
//! and mock backends served by axum on a local port.
#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reportchat::auth::{AuthGate, AuthBackend, GateSettings, Identity, SsoSdk};
use reportchat::chat::{
    ChatView, ConnectionStatus, PrintMode, QueryCategory, RenderedMessage, SidebarConfig,
    SystemStatus,
};
use reportchat::input::InputControl;
use reportchat::surface::{InputPresentation, InputSurface, Notice};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Base URL nothing listens on.
pub fn dead_url() -> String {
    format!("http://127.0.0.1:{}", free_port())
}

/// Serve `router` on an ephemeral port; the task is left running when the test ends.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Headers `/auth/verify` was called with: (X-Teams-Token, Authorization).
pub type SeenHeaders = Arc<Mutex<Vec<(Option<String>, Option<String>)>>>;

#[derive(Clone)]
struct VerifyState {
    status: StatusCode,
    body: Value,
    seen: SeenHeaders,
}

async fn verify(
    State(s): State<VerifyState>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    s.seen
        .lock()
        .unwrap()
        .push((header("x-teams-token"), header("authorization")));
    (s.status, Json(s.body.clone()))
}

/// `/auth/verify` answering `status` with `body`, plus `/auth/logout`. No `/teams` route.
pub fn auth_routes(status: u16, body: Value) -> (Router, SeenHeaders) {
    let seen: SeenHeaders = Arc::default();
    let state = VerifyState {
        status: StatusCode::from_u16(status).expect("status"),
        body,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/auth/verify", post(verify))
        .route(
            "/auth/logout",
            post(|| async { Json(serde_json::json!({ "success": true })) }),
        )
        .with_state(state);
    (router, seen)
}

/// Auth backend whose `/auth/verify` always answers `status` with `body`
/// and whose `/teams` auth check passes.
pub async fn auth_server(status: u16, body: Value) -> (String, SeenHeaders) {
    let (router, seen) = auth_routes(status, body);
    let router = router.route("/teams", get(|| async { "ok" }));
    (serve(router).await, seen)
}

#[derive(Default)]
pub struct Recorder {
    pub presentation: Mutex<Option<InputPresentation>>,
    pub overlay: AtomicBool,
    pub notices: AtomicUsize,
    pub dismissed: AtomicUsize,
    pub redirects: Mutex<Vec<String>>,
    pub identity: Mutex<Option<Identity>>,
}

impl Recorder {
    /// Flip the rendered input behind the gate's back.
    pub fn tamper(&self, enabled: bool) {
        if let Some(p) = self.presentation.lock().unwrap().as_mut() {
            p.input_enabled = enabled;
            p.send_enabled = enabled;
        }
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn notices(&self) -> usize {
        self.notices.load(Ordering::SeqCst)
    }
}

impl InputSurface for Recorder {
    fn apply_input(&self, p: &InputPresentation) {
        *self.presentation.lock().unwrap() = Some(p.clone());
    }
    fn input_enabled(&self) -> bool {
        self.presentation
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.input_enabled)
            .unwrap_or(true)
    }
    fn set_overlay(&self, visible: bool) {
        self.overlay.store(visible, Ordering::SeqCst);
    }
    fn show_notice(&self, _: &Notice) {
        self.notices.fetch_add(1, Ordering::SeqCst);
    }
    fn dismiss_notice(&self, _: &Notice) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
    fn show_identity(&self, identity: &Identity) {
        *self.identity.lock().unwrap() = Some(identity.clone());
    }
    fn clear_identity(&self) {
        *self.identity.lock().unwrap() = None;
    }
    fn redirect(&self, route: &str) {
        self.redirects.lock().unwrap().push(route.to_string());
    }
}

pub fn settings(watchdog: Duration) -> GateSettings {
    GateSettings {
        token_timeout: Duration::from_secs(2),
        watchdog_interval: watchdog,
        error_route: "/auth/error".to_string(),
    }
}

pub fn new_gate(
    sdk: Option<Arc<dyn SsoSdk>>,
    backend: Arc<dyn AuthBackend>,
    settings: GateSettings,
) -> (Arc<Recorder>, Arc<InputControl>, Arc<AuthGate>) {
    let surface = Arc::new(Recorder::default());
    let input = Arc::new(InputControl::new(
        surface.clone(),
        "Ask me about reports...",
        Duration::from_millis(10),
    ));
    let gate = Arc::new(AuthGate::new(sdk, backend, input.clone(), settings));
    (surface, input, gate)
}

#[derive(Default)]
pub struct Transcript {
    pub messages: Mutex<Vec<RenderedMessage>>,
    pub status: Mutex<Vec<ConnectionStatus>>,
    pub typing: Mutex<Vec<bool>>,
    pub samples: Mutex<Option<Option<Vec<QueryCategory>>>>,
    pub sidebar: Mutex<Option<Option<SidebarConfig>>>,
    pub system: Mutex<Option<SystemStatus>>,
}

impl Transcript {
    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.body.as_str().to_string())
            .collect()
    }
}

impl ChatView for Transcript {
    fn append_message(&self, m: &RenderedMessage) {
        self.messages.lock().unwrap().push(m.clone());
    }
    fn set_typing(&self, typing: bool) {
        self.typing.lock().unwrap().push(typing);
    }
    fn clear_messages(&self) {
        self.messages.lock().unwrap().clear();
    }
    fn set_connection_status(&self, s: ConnectionStatus) {
        self.status.lock().unwrap().push(s);
    }
    fn show_samples(&self, c: Option<&[QueryCategory]>) {
        *self.samples.lock().unwrap() = Some(c.map(|c| c.to_vec()));
    }
    fn show_sidebar(&self, s: Option<&SidebarConfig>) {
        *self.sidebar.lock().unwrap() = Some(s.cloned());
    }
    fn show_system_status(&self, s: &SystemStatus) {
        *self.system.lock().unwrap() = Some(s.clone());
    }
    fn request_print(&self, _: &RenderedMessage, _: PrintMode) {}
}

/// Poll `check` every 10 ms for up to 3 s.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
