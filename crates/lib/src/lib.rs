//! Report assistant chat client: SSO auth gate, realtime chat session, and the shared
//! input arbiter, composed by [`app::App`]. Hosts plug in through the `surface` and
//! `chat::ChatView` traits.

pub mod app;
pub mod auth;
pub mod chat;
pub mod config;
pub mod input;
pub mod surface;
