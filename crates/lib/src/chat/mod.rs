//! Chat session: realtime transport, message rendering, and the startup side panels.

mod catalog;
mod protocol;
mod render;
mod session;
mod transport;
mod view;

pub use catalog::{
    categorize, parse_samples, CatalogClient, CatalogError, QueryCategory, SampleQuery,
    SidebarConfig, SidebarItem, SidebarSection, StatusConfiguration, SystemStatus, ToggleStyle,
};
pub use protocol::{ClientEvent, ServerEvent};
pub use render::{
    autosize_height, format_time, render_message, CharCount, CountLevel, MessageBody, PrintMode,
    RenderedMessage, Sender,
};
pub use session::{ChatSession, SendError, SessionSettings};
pub use transport::{ChatTransport, TransportError, WsTransport};
pub use view::{ChatView, ConnectionStatus};
