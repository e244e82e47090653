//! Chat session controller: sends user messages, renders what comes back, and loads the
//! side panels at startup.

use super::catalog::CatalogClient;
use super::protocol::{ClientEvent, ServerEvent};
use super::render::{autosize_height, render_message, CharCount, PrintMode, RenderedMessage, Sender};
use super::transport::{ChatTransport, TransportError};
use super::view::{ChatView, ConnectionStatus};
use crate::config::ChatConfig;
use crate::input::{DisableReason, InputControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CONNECTION_ERROR_TEXT: &str = "❌ Connection error. Please refresh the page.";
const SEND_ERROR_TEXT: &str = "❌ Error sending message. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("message is empty")]
    Empty,
    #[error("no realtime transport attached")]
    NoTransport,
    #[error("not connected")]
    NotConnected,
    #[error("input is disabled")]
    InputDisabled,
    #[error("message is {length} characters, limit is {max}")]
    TooLong { length: usize, max: usize },
    #[error("emit failed: {0}")]
    Emit(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_input_chars: usize,
    pub send_cooldown: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for SessionSettings {
    fn from(c: &ChatConfig) -> Self {
        Self {
            max_input_chars: c.max_input_chars,
            send_cooldown: c.send_cooldown(),
        }
    }
}

struct SessionInner {
    transport: Option<Arc<dyn ChatTransport>>,
    connection: ConnectionStatus,
    draft: String,
}

pub struct ChatSession {
    input: Arc<InputControl>,
    view: Arc<dyn ChatView>,
    catalog: Option<CatalogClient>,
    settings: SessionSettings,
    hosted: AtomicBool,
    inner: Mutex<SessionInner>,
    cooldown: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// `catalog: None` skips the startup panels.
    pub fn new(
        input: Arc<InputControl>,
        view: Arc<dyn ChatView>,
        catalog: Option<CatalogClient>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            input,
            view,
            catalog,
            settings,
            hosted: AtomicBool::new(false),
            inner: Mutex::new(SessionInner {
                transport: None,
                connection: ConnectionStatus::Disconnected,
                draft: String::new(),
            }),
            cooldown: Mutex::new(None),
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn attach_transport(&self, transport: Arc<dyn ChatTransport>) {
        self.inner().transport = Some(transport);
    }

    /// Hosted surfaces print inline; standalone ones open a popup.
    pub fn set_hosted(&self, hosted: bool) {
        self.hosted.store(hosted, Ordering::SeqCst);
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.inner().connection
    }

    pub fn is_connected(&self) -> bool {
        let g = self.inner();
        g.connection == ConnectionStatus::Connected
            && g.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    pub fn draft(&self) -> String {
        self.inner().draft.clone()
    }

    /// Replace the draft and refresh the character counter.
    pub fn set_draft(&self, text: &str) -> CharCount {
        self.inner().draft = text.to_string();
        let count = CharCount::of(text, self.settings.max_input_chars);
        self.view.set_char_count(&count);
        count
    }

    pub fn char_count(&self) -> CharCount {
        CharCount::of(&self.inner().draft, self.settings.max_input_chars)
    }

    pub fn autosize_height(&self, content_height: u32) -> u32 {
        autosize_height(content_height)
    }

    fn append(&self, message: RenderedMessage) {
        self.view.append_message(&message);
        if message.print_requested {
            let mode = PrintMode::for_host(self.hosted.load(Ordering::SeqCst));
            log::info!("print request detected in {}, opening print view ({:?})", message.id, mode);
            self.view.request_print(&message, mode);
        }
    }

    fn append_error(&self, text: &str) {
        self.append(render_message(text, Sender::Assistant, "error", None));
    }

    /// Send the current draft.
    pub async fn send_draft(&self) -> Result<(), SendError> {
        let draft = self.draft();
        self.send(&draft).await
    }

    /// Send `text` as a user message.
    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SendError::Empty);
        }
        let transport = self.inner().transport.clone().ok_or(SendError::NoTransport)?;
        if !transport.is_connected() || self.connection() != ConnectionStatus::Connected {
            log::warn!("send attempted while disconnected");
            self.append_error(CONNECTION_ERROR_TEXT);
            return Err(SendError::NotConnected);
        }
        if !self.input.input_allowed() {
            return Err(SendError::InputDisabled);
        }
        let length = message.chars().count();
        if length > self.settings.max_input_chars {
            return Err(SendError::TooLong {
                length,
                max: self.settings.max_input_chars,
            });
        }

        self.append(render_message(message, Sender::User, "chat", None));
        let event = ClientEvent::UserMessage {
            message: message.to_string(),
        };
        if let Err(e) = transport.emit(event).await {
            log::error!("failed to send message: {}", e);
            self.append_error(SEND_ERROR_TEXT);
            return Err(e.into());
        }

        self.set_draft("");
        self.start_cooldown().await;
        Ok(())
    }

    /// Restarts the send cooldown; only the latest send's timer re-enables the send control.
    async fn start_cooldown(&self) {
        self.input.disable(DisableReason::SendInFlight).await;
        let input = self.input.clone();
        let cooldown = self.settings.send_cooldown;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            input.enable(DisableReason::SendInFlight);
        });
        let previous = self
            .cooldown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(timer);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Put a sample query in the draft and send it. Ignored while disconnected.
    pub async fn send_sample_query(&self, query: &str) -> Result<(), SendError> {
        if !self.is_connected() {
            log::debug!("sample query ignored while disconnected");
            return Err(SendError::NotConnected);
        }
        self.set_draft(query);
        self.send_draft().await
    }

    /// Ask the server to clear the conversation; the transcript clears on `chat_cleared`.
    pub async fn clear_chat(&self) -> Result<(), SendError> {
        if !self.is_connected() {
            return Err(SendError::NotConnected);
        }
        let transport = self.inner().transport.clone().ok_or(SendError::NoTransport)?;
        transport.emit(ClientEvent::ClearChat).await?;
        Ok(())
    }

    pub fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Connected => self.set_connection(ConnectionStatus::Connected),
            ServerEvent::Disconnected => {
                log::warn!("realtime channel disconnected");
                self.set_connection(ConnectionStatus::Disconnected);
            }
            ServerEvent::ConnectError(e) => {
                log::error!("realtime connection error: {}", e);
                self.set_connection(ConnectionStatus::ConnectionError);
            }
            ServerEvent::BotMessage {
                message,
                kind,
                timestamp,
            } => self.append(render_message(&message, Sender::Bot, &kind, timestamp.as_deref())),
            ServerEvent::UserMessageEcho { message, timestamp } => {
                self.append(render_message(&message, Sender::User, "chat", timestamp.as_deref()))
            }
            ServerEvent::BotTyping(typing) => self.view.set_typing(typing),
            ServerEvent::ChatCleared => self.view.clear_messages(),
        }
    }

    fn set_connection(&self, status: ConnectionStatus) {
        self.inner().connection = status;
        self.view.set_connection_status(status);
    }

    /// Drain transport events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<ServerEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        log::debug!("realtime event stream ended");
    }

    /// Fetch samples, sidebar and system status concurrently and hand them to the view.
    pub async fn load_startup_config(&self) {
        let Some(catalog) = self.catalog.as_ref() else {
            log::debug!("no catalog configured, skipping startup panels");
            return;
        };
        let (samples, sidebar, status) =
            tokio::join!(catalog.samples(), catalog.sidebar(), catalog.system_status());

        match samples {
            Ok(categories) => self.view.show_samples(Some(&categories)),
            Err(e) => {
                log::error!("failed to load samples: {}", e);
                self.view.show_samples(None);
            }
        }
        match sidebar {
            Ok(config) => self.view.show_sidebar(Some(&config)),
            Err(e) => {
                log::error!("failed to load sidebar configuration: {}", e);
                self.view.show_sidebar(None);
            }
        }
        match status {
            Ok(s) => {
                log::info!(
                    "system status: {} ({} sidebar items)",
                    s.approach_label(),
                    s.configuration.sidebar_items_count
                );
                self.view.show_system_status(&s);
            }
            Err(e) => log::warn!("failed to load system status: {}", e),
        }
    }
}
