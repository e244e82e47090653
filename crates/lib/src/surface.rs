//! UI surface seam: the element handles the auth gate and chat session mutate.
//!
//! A browser host implements this over the input box, send button, chat container and
//! modal layer; the CLI implements it over the terminal. Implementations are injected,
//! so every handle exists before the gate is constructed; `is_ready` covers hosts whose
//! markup can lag behind script start.

use crate::auth::Identity;

/// Rendered state of the text input and send control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPresentation {
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub placeholder: String,
    /// Tooltip on the send control; empty when enabled.
    pub send_title: String,
}

/// Modal / banner content the gate can raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Authenticated with the identity provider but not provisioned downstream.
    NotRegistered,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::NotRegistered => "User Not Registered",
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Notice::NotRegistered => {
                "You are authenticated but not registered in the reporting system. \
                 Please contact your administrator to register your account."
            }
        }
    }
}

/// Element handles mutated by the gate. All methods are synchronous and cheap.
pub trait InputSurface: Send + Sync {
    /// True once the input and send control exist.
    fn is_ready(&self) -> bool {
        true
    }

    /// Apply enabled flags, placeholder and send title.
    fn apply_input(&self, presentation: &InputPresentation);

    /// Whether the text input is currently interactive, as the surface sees it.
    /// May disagree with the last `apply_input` if something else touched the element.
    fn input_enabled(&self) -> bool;

    /// Attach or remove the non-interactive overlay over the chat area.
    fn set_overlay(&self, visible: bool);

    fn show_notice(&self, notice: &Notice);

    fn dismiss_notice(&self, notice: &Notice);

    /// Present the signed-in identity (sidebar footer, header greeting).
    fn show_identity(&self, _identity: &Identity) {}

    fn clear_identity(&self) {}

    /// Navigate the whole surface to another route (e.g. "/auth/error").
    fn redirect(&self, route: &str);
}
