//! Input availability arbiter shared by the auth gate and the chat session.
//!
//! Two writers disable the input for different reasons: the gate (not authenticated or
//! not registered) and the session (a send is in flight). Each writer only sets or clears
//! its own reason, and the rendered state is derived from the whole set, so a send
//! cooldown ending can never re-open input the gate closed, and vice versa.

use crate::surface::{InputPresentation, InputSurface};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const DISABLED_PLACEHOLDER: &str = "User not registered - contact administrator";
const DISABLED_SEND_TITLE: &str = "Chat disabled - user not registered";
const SENDING_SEND_TITLE: &str = "Sending...";

/// Why the input (or part of it) is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisableReason {
    /// Owned by the auth gate. Disables text input and send control, attaches the overlay.
    Auth,
    /// Owned by the chat session. Disables only the send control.
    SendInFlight,
}

#[derive(Debug, Default, Clone, Copy)]
struct Reasons {
    auth: bool,
    send_in_flight: bool,
}

impl Reasons {
    fn set(&mut self, reason: DisableReason, on: bool) {
        match reason {
            DisableReason::Auth => self.auth = on,
            DisableReason::SendInFlight => self.send_in_flight = on,
        }
    }

    fn has(&self, reason: DisableReason) -> bool {
        match reason {
            DisableReason::Auth => self.auth,
            DisableReason::SendInFlight => self.send_in_flight,
        }
    }
}

pub struct InputControl {
    surface: Arc<dyn InputSurface>,
    reasons: Mutex<Reasons>,
    placeholder: String,
    retry_delay: Duration,
}

impl InputControl {
    /// `placeholder` is shown while the input is usable; `retry_delay` is how long a
    /// disable waits for a surface that is not ready yet before giving up.
    pub fn new(
        surface: Arc<dyn InputSurface>,
        placeholder: impl Into<String>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            surface,
            reasons: Mutex::new(Reasons::default()),
            placeholder: placeholder.into(),
            retry_delay,
        }
    }

    fn reasons(&self) -> MutexGuard<'_, Reasons> {
        self.reasons.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn surface(&self) -> &Arc<dyn InputSurface> {
        &self.surface
    }

    pub fn is_disabled_by(&self, reason: DisableReason) -> bool {
        self.reasons().has(reason)
    }

    /// True when the text input may be typed into (no auth disable).
    pub fn input_allowed(&self) -> bool {
        !self.reasons().auth
    }

    /// The presentation implied by the current reasons.
    pub fn presentation(&self) -> InputPresentation {
        let r = *self.reasons();
        if r.auth {
            InputPresentation {
                input_enabled: false,
                send_enabled: false,
                placeholder: DISABLED_PLACEHOLDER.to_string(),
                send_title: DISABLED_SEND_TITLE.to_string(),
            }
        } else {
            InputPresentation {
                input_enabled: true,
                send_enabled: !r.send_in_flight,
                placeholder: self.placeholder.clone(),
                send_title: if r.send_in_flight {
                    SENDING_SEND_TITLE.to_string()
                } else {
                    String::new()
                },
            }
        }
    }

    fn apply(&self) {
        let p = self.presentation();
        self.surface.apply_input(&p);
        self.surface.set_overlay(!p.input_enabled);
    }

    /// Record or clear `reason` without touching the surface; `reconcile` renders it.
    pub fn set_reason(&self, reason: DisableReason, on: bool) {
        self.reasons().set(reason, on);
    }

    /// Add `reason` and re-render. Idempotent. If the surface is not ready, waits one
    /// retry delay and tries once more; returns false when the surface never appeared
    /// (the reason stays recorded and the watchdog applies it later).
    pub async fn disable(&self, reason: DisableReason) -> bool {
        self.reasons().set(reason, true);
        if !self.surface.is_ready() {
            log::debug!("input surface not ready, retrying disable in {:?}", self.retry_delay);
            tokio::time::sleep(self.retry_delay).await;
            if !self.surface.is_ready() {
                log::warn!("input surface still not ready; deferring {:?} disable", reason);
                return false;
            }
        }
        self.apply();
        true
    }

    /// Clear `reason` and re-render. Idempotent; other reasons stay in force.
    pub fn enable(&self, reason: DisableReason) {
        self.reasons().set(reason, false);
        if self.surface.is_ready() {
            self.apply();
        }
    }

    /// Re-render if the surface disagrees with the current reasons (e.g. an external
    /// actor flipped the element). Returns true when something was re-applied.
    pub fn reconcile(&self) -> bool {
        if !self.surface.is_ready() {
            return false;
        }
        let wanted = self.presentation().input_enabled;
        if self.surface.input_enabled() == wanted {
            return false;
        }
        log::info!(
            "input state drifted (surface enabled={}, wanted {}), re-applying",
            !wanted,
            wanted
        );
        self.apply();
        true
    }
}
