//! Message rendering model and input housekeeping (char count, auto-resize).

use chrono::{DateTime, Local, NaiveDateTime};

/// Markers in a reply that ask the client to open the print view.
const PRINT_MARKERS: &[&str] = &["openPrintWindow", "Print window will open"];

/// Tallest the input grows to, in pixels.
const MAX_INPUT_HEIGHT: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
    /// Locally generated notices (connection errors and the like).
    Assistant,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
            Sender::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// Server-rendered HTML report (table or div block), shown without a text wrapper.
    Report(String),
}

impl MessageBody {
    pub fn as_str(&self) -> &str {
        match self {
            MessageBody::Text(s) | MessageBody::Report(s) => s,
        }
    }
}

/// Where the print view opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Overlay in the current surface (hosted containers block popups).
    Inline,
    /// Separate window, falling back to inline if it cannot be opened.
    Popup,
}

impl PrintMode {
    pub fn for_host(hosted: bool) -> Self {
        if hosted {
            PrintMode::Inline
        } else {
            PrintMode::Popup
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: String,
    pub sender: Sender,
    /// "chat", "error", or whatever type the server tagged the reply with.
    pub kind: String,
    pub body: MessageBody,
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    pub print_requested: bool,
}

pub fn render_message(
    text: &str,
    sender: Sender,
    kind: &str,
    timestamp: Option<&str>,
) -> RenderedMessage {
    let trimmed = text.trim_start();
    let body = if trimmed.starts_with("<div") || trimmed.starts_with("<table") {
        MessageBody::Report(text.to_string())
    } else {
        MessageBody::Text(text.to_string())
    };
    RenderedMessage {
        id: format!("msg-{}", uuid::Uuid::new_v4()),
        sender,
        kind: kind.to_string(),
        print_requested: PRINT_MARKERS.iter().any(|m| text.contains(m)),
        body,
        time: format_time(timestamp),
    }
}

/// Parse an RFC 3339 or naive ISO timestamp into local `HH:MM:SS`; now when absent or invalid.
pub fn format_time(timestamp: Option<&str>) -> String {
    let parsed = timestamp.and_then(|ts| {
        let ts = ts.trim();
        DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Local))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .and_then(|n| n.and_local_timezone(Local).earliest())
            })
    });
    parsed
        .unwrap_or_else(Local::now)
        .format("%H:%M:%S")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountLevel {
    Normal,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCount {
    pub length: usize,
    pub max: usize,
    pub level: CountLevel,
}

impl CharCount {
    /// Warning above 80% of `max`, error above 90%.
    pub fn of(text: &str, max: usize) -> Self {
        let length = text.chars().count();
        let level = if length * 10 > max * 9 {
            CountLevel::Error
        } else if length * 10 > max * 8 {
            CountLevel::Warning
        } else {
            CountLevel::Normal
        };
        Self { length, max, level }
    }

    pub fn over_limit(&self) -> bool {
        self.length > self.max
    }
}

impl std::fmt::Display for CharCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.length, self.max)
    }
}

pub fn autosize_height(content_height: u32) -> u32 {
    content_height.min(MAX_INPUT_HEIGHT)
}
