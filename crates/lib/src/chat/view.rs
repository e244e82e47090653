//! Transcript and side-panel seam, implemented by whatever renders the chat.

use super::catalog::{QueryCategory, SidebarConfig, SystemStatus};
use super::render::{CharCount, PrintMode, RenderedMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    ConnectionError,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::ConnectionError => "Connection Error",
        }
    }
}

/// Everything the session draws outside the input box.
///
/// `show_samples` and `show_sidebar` receive `None` when loading failed; the view shows
/// "Failed to load samples" / "Failed to load menu" in that slot.
pub trait ChatView: Send + Sync {
    fn append_message(&self, message: &RenderedMessage);

    fn set_typing(&self, typing: bool);

    fn clear_messages(&self);

    fn set_connection_status(&self, status: ConnectionStatus);

    fn set_char_count(&self, _count: &CharCount) {}

    fn show_samples(&self, categories: Option<&[QueryCategory]>);

    fn show_sidebar(&self, sidebar: Option<&SidebarConfig>);

    fn show_system_status(&self, _status: &SystemStatus) {}

    /// A reply asked for the print view.
    fn request_print(&self, message: &RenderedMessage, mode: PrintMode);
}
