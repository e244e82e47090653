//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.reportchat/config.json`) and environment.
//! Every field has a default, so a missing file or an empty `{}` is a working config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend server settings (HTTP endpoints and realtime socket).
    #[serde(default)]
    pub backend: BackendConfig,

    /// Authentication gate timings and routes.
    #[serde(default)]
    pub gate: GateConfig,

    /// Chat input and send behaviour.
    #[serde(default)]
    pub chat: ChatConfig,

    /// SSO host settings used by the CLI's static SDK.
    #[serde(default)]
    pub sso: SsoConfig,
}

/// Where the backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL for HTTP endpoints (default "http://127.0.0.1:5000"). Overridden by REPORTCHAT_BACKEND_URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the realtime WebSocket endpoint on the same host (default "/ws").
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// How often the watchdog re-asserts the input state (default 5000).
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_interval_ms: u64,

    /// Upper bound on the SDK's callback-style token request (default 30000).
    #[serde(default = "default_token_timeout_ms")]
    pub token_timeout_ms: u64,

    /// Delay before the single retry when the surface is not ready (default 1000).
    #[serde(default = "default_disable_retry_ms")]
    pub disable_retry_ms: u64,

    /// Route the surface is sent to on critical auth failures (default "/auth/error").
    #[serde(default = "default_error_route")]
    pub error_route: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Maximum characters accepted by the input (default 500).
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// How long the send control stays disabled after a send (default 1000).
    #[serde(default = "default_send_cooldown_ms")]
    pub send_cooldown_ms: u64,

    /// Placeholder shown while the input is usable.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

/// Static SSO host for non-browser runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoConfig {
    /// Host name reported in the SDK context (e.g. "Teams"). The CLI falls back to "terminal".
    pub host: Option<String>,
    /// SSO token. Overridden by REPORTCHAT_SSO_TOKEN env.
    pub token: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_socket_path() -> String {
    "/ws".to_string()
}

fn default_watchdog_ms() -> u64 {
    5000
}

fn default_token_timeout_ms() -> u64 {
    30_000
}

fn default_disable_retry_ms() -> u64 {
    1000
}

fn default_error_route() -> String {
    "/auth/error".to_string()
}

fn default_max_input_chars() -> usize {
    500
}

fn default_send_cooldown_ms() -> u64 {
    1000
}

fn default_placeholder() -> String {
    "Ask me about reports...".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            socket_path: default_socket_path(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: default_watchdog_ms(),
            token_timeout_ms: default_token_timeout_ms(),
            disable_retry_ms: default_disable_retry_ms(),
            error_route: default_error_route(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            send_cooldown_ms: default_send_cooldown_ms(),
            placeholder: default_placeholder(),
        }
    }
}

impl GateConfig {
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(1))
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    pub fn disable_retry(&self) -> Duration {
        Duration::from_millis(self.disable_retry_ms)
    }
}

impl ChatConfig {
    pub fn send_cooldown(&self) -> Duration {
        Duration::from_millis(self.send_cooldown_ms)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the backend base URL: env REPORTCHAT_BACKEND_URL overrides config. No trailing slash.
pub fn resolve_base_url(config: &Config) -> String {
    env_non_empty("REPORTCHAT_BACKEND_URL")
        .unwrap_or_else(|| config.backend.base_url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// WebSocket URL for the realtime channel, derived from the base URL (http → ws, https → wss).
pub fn resolve_socket_url(config: &Config) -> String {
    let base = resolve_base_url(config);
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base
    };
    let path = config.backend.socket_path.trim();
    if path.starts_with('/') {
        format!("{}{}", ws_base, path)
    } else {
        format!("{}/{}", ws_base, path)
    }
}

/// Resolve the SSO token: env REPORTCHAT_SSO_TOKEN overrides config.
pub fn resolve_sso_token(config: &Config) -> Option<String> {
    env_non_empty("REPORTCHAT_SSO_TOKEN").or_else(|| {
        config
            .sso
            .token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("REPORTCHAT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".reportchat").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write a default config file if none exists. Returns true when a file was created.
pub fn init_config(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        log::debug!("config already exists at {}, skipping", path.display());
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, body)
        .with_context(|| format!("writing default config to {}", path.display()))?;
    log::info!("created default config at {}", path.display());
    Ok(true)
}
