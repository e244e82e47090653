//! Application root: owns the input arbiter, auth gate, chat session and watchdog.

use crate::auth::{AuthGate, GateSettings, GateState, HttpAuthBackend, SsoSdk};
use crate::chat::{CatalogClient, ChatSession, ChatView, SessionSettings, WsTransport};
use crate::config::{resolve_base_url, resolve_socket_url, Config};
use crate::input::InputControl;
use crate::surface::InputSurface;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct App {
    input: Arc<InputControl>,
    gate: Arc<AuthGate>,
    session: Arc<ChatSession>,
    socket_url: String,
    watchdog: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl App {
    /// Wire everything against the configured backend. `sdk: None` runs standalone.
    pub fn new(
        config: &Config,
        surface: Arc<dyn InputSurface>,
        view: Arc<dyn ChatView>,
        sdk: Option<Arc<dyn SsoSdk>>,
    ) -> Self {
        let base_url = resolve_base_url(config);
        let input = Arc::new(InputControl::new(
            surface,
            config.chat.placeholder.clone(),
            config.gate.disable_retry(),
        ));
        let gate = Arc::new(AuthGate::new(
            sdk,
            Arc::new(HttpAuthBackend::new(base_url.clone())),
            input.clone(),
            GateSettings::from(&config.gate),
        ));
        let session = Arc::new(ChatSession::new(
            input.clone(),
            view,
            Some(CatalogClient::new(base_url)),
            SessionSettings::from(&config.chat),
        ));
        Self::from_parts(input, gate, session, resolve_socket_url(config))
    }

    /// Assemble from pre-built parts (custom backends, fakes).
    pub fn from_parts(
        input: Arc<InputControl>,
        gate: Arc<AuthGate>,
        session: Arc<ChatSession>,
        socket_url: impl Into<String>,
    ) -> Self {
        Self {
            input,
            gate,
            session,
            socket_url: socket_url.into(),
            watchdog: None,
            reader: None,
        }
    }

    pub fn input(&self) -> &Arc<InputControl> {
        &self.input
    }

    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }

    pub fn session(&self) -> &Arc<ChatSession> {
        &self.session
    }

    /// Start the watchdog and run the SSO handshake. The session learns whether the
    /// surface is hosted so print requests open in the right place.
    pub async fn start(&mut self) -> GateState {
        if self.watchdog.is_none() {
            self.watchdog = Some(self.gate.spawn_watchdog());
        }
        let state = self.gate.initialize().await;
        self.session.set_hosted(self.gate.status().hosted);
        log::info!("auth gate settled in state {}", state);
        state
    }

    /// Open the realtime channel and start draining its events into the session.
    /// A failed connect is shown as a connection error, not returned.
    pub async fn connect(&mut self) {
        match WsTransport::connect(&self.socket_url).await {
            Ok((transport, events)) => {
                self.session.attach_transport(Arc::new(transport));
                let session = self.session.clone();
                if let Some(old) = self.reader.replace(tokio::spawn(async move {
                    session.run(events).await;
                })) {
                    old.abort();
                }
            }
            Err(e) => {
                log::error!("could not connect to {}: {}", self.socket_url, e);
                self.session
                    .handle_event(crate::chat::ServerEvent::ConnectError(e.to_string()));
            }
        }
    }

    /// Load the startup side panels.
    pub async fn load_panels(&self) {
        self.session.load_startup_config().await;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(h) = self.watchdog.take() {
            h.abort();
        }
        if let Some(h) = self.reader.take() {
            h.abort();
        }
    }
}
