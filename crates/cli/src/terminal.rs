//! Terminal host: renders the input surface and chat view as printed lines.

use reportchat::auth::Identity;
use reportchat::chat::{
    ChatView, ConnectionStatus, MessageBody, PrintMode, QueryCategory, RenderedMessage,
    SampleQuery, Sender, SidebarConfig, SystemStatus,
};
use reportchat::surface::{InputPresentation, InputSurface, Notice};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Screen {
    presentation: Option<InputPresentation>,
    overlay: bool,
    samples: Vec<SampleQuery>,
    redirected_to: Option<String>,
}

#[derive(Default)]
pub struct TerminalSurface {
    screen: Mutex<Screen>,
}

impl TerminalSurface {
    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sample query by 1-based index, in the order they were listed.
    pub fn sample(&self, index: usize) -> Option<String> {
        let s = self.screen();
        index
            .checked_sub(1)
            .and_then(|i| s.samples.get(i))
            .map(|q| q.query.clone())
    }

    pub fn redirected_to(&self) -> Option<String> {
        self.screen().redirected_to.clone()
    }

    /// Placeholder line shown before the prompt.
    pub fn prompt_hint(&self) -> Option<String> {
        self.screen().presentation.as_ref().map(|p| p.placeholder.clone())
    }
}

impl InputSurface for TerminalSurface {
    fn apply_input(&self, presentation: &InputPresentation) {
        let mut s = self.screen();
        let changed = s
            .presentation
            .as_ref()
            .map_or(true, |p| p.input_enabled != presentation.input_enabled);
        if changed && !presentation.input_enabled {
            println!("[input disabled] {}", presentation.placeholder);
        }
        s.presentation = Some(presentation.clone());
    }

    fn input_enabled(&self) -> bool {
        self.screen()
            .presentation
            .as_ref()
            .map_or(true, |p| p.input_enabled)
    }

    fn set_overlay(&self, visible: bool) {
        self.screen().overlay = visible;
    }

    fn show_notice(&self, notice: &Notice) {
        println!("== {} ==\n{}", notice.title(), notice.body());
    }

    fn dismiss_notice(&self, _notice: &Notice) {}

    fn show_identity(&self, identity: &Identity) {
        println!("{}", identity.greeting());
        println!("signed in: {}", identity.header_label());
    }

    fn clear_identity(&self) {
        println!("signed out");
    }

    fn redirect(&self, route: &str) {
        println!("[redirect] {}", route);
        self.screen().redirected_to = Some(route.to_string());
    }
}

impl ChatView for TerminalSurface {
    fn append_message(&self, message: &RenderedMessage) {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
            Sender::Assistant => "!",
        };
        match &message.body {
            MessageBody::Text(t) => println!("[{}] {}: {}", message.time, who, t),
            MessageBody::Report(html) => {
                println!("[{}] {}: (report, {} bytes)", message.time, who, html.len())
            }
        }
    }

    fn set_typing(&self, typing: bool) {
        if typing {
            println!("bot is typing...");
        }
    }

    fn clear_messages(&self) {
        println!("-- chat cleared --");
    }

    fn set_connection_status(&self, status: ConnectionStatus) {
        println!("[{}]", status.label());
    }

    fn show_samples(&self, categories: Option<&[QueryCategory]>) {
        let Some(categories) = categories else {
            println!("Failed to load samples");
            return;
        };
        let mut s = self.screen();
        s.samples.clear();
        for c in categories {
            println!("{}", c.name);
            for q in &c.queries {
                s.samples.push(q.clone());
                println!("  {}. {} - {}", s.samples.len(), q.title, q.description);
            }
        }
    }

    fn show_sidebar(&self, sidebar: Option<&SidebarConfig>) {
        let Some(sidebar) = sidebar else {
            println!("Failed to load menu");
            return;
        };
        for section in &sidebar.sections {
            let toggle = section.toggle_icon().unwrap_or(" ");
            println!("{} {} {}", toggle, section.icon, section.title);
            if section.expanded {
                for item in &section.items {
                    println!("    {} {}", item.icon, item.label);
                }
            }
        }
    }

    fn show_system_status(&self, status: &SystemStatus) {
        println!(
            "{} | {} sidebar items",
            status.approach_label(),
            status.configuration.sidebar_items_count
        );
    }

    fn request_print(&self, message: &RenderedMessage, mode: PrintMode) {
        println!("[print] {} requested ({:?})", message.id, mode);
    }
}
