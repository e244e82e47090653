//! Realtime channel frames: `{ "event": <name>, "data": <object> }`.

use serde::Deserialize;

/// Events the session consumes. `Connected` / `Disconnected` / `ConnectError` are raised
/// by the transport itself, not sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected,
    Disconnected,
    ConnectError(String),
    BotMessage {
        message: String,
        kind: String,
        timestamp: Option<String>,
    },
    UserMessageEcho {
        message: String,
        timestamp: Option<String>,
    },
    BotTyping(bool),
    ChatCleared,
}

/// Events the session emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    UserMessage { message: String },
    ClearChat,
}

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn str_field(data: &serde_json::Value, key: &str) -> Option<String> {
    data.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

impl ServerEvent {
    /// Parse one text frame. Unknown event names yield `Ok(None)`.
    pub fn from_frame(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let frame: Frame = serde_json::from_str(text)?;
        let data = &frame.data;
        let event = match frame.event.as_str() {
            "bot_message" => ServerEvent::BotMessage {
                message: str_field(data, "message").unwrap_or_default(),
                kind: str_field(data, "type").unwrap_or_else(|| "chat".to_string()),
                timestamp: str_field(data, "timestamp"),
            },
            "user_message_echo" => ServerEvent::UserMessageEcho {
                message: str_field(data, "message").unwrap_or_default(),
                timestamp: str_field(data, "timestamp"),
            },
            "bot_typing" => {
                ServerEvent::BotTyping(data.get("typing").and_then(|v| v.as_bool()).unwrap_or(false))
            }
            "chat_cleared" => ServerEvent::ChatCleared,
            other => {
                log::debug!("ignoring unknown realtime event {:?}", other);
                return Ok(None);
            }
        };
        Ok(Some(event))
    }
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::UserMessage { .. } => "user_message",
            ClientEvent::ClearChat => "clear_chat",
        }
    }

    pub fn to_frame(&self) -> String {
        let data = match self {
            ClientEvent::UserMessage { message } => serde_json::json!({ "message": message }),
            ClientEvent::ClearChat => serde_json::json!({}),
        };
        serde_json::json!({ "event": self.name(), "data": data }).to_string()
    }
}
