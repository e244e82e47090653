//! Read-only startup documents: sample queries, sidebar sections, system status.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog api error: {0}")]
    Api(String),
}

/// One sample query parsed from the samples text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleQuery {
    pub title: String,
    pub description: String,
    pub query: String,
}

/// A named group of sample queries, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCategory {
    pub name: &'static str,
    pub queries: Vec<SampleQuery>,
}

impl QueryCategory {
    /// Kebab-case id used for expand/collapse state.
    pub fn id(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }
}

const CAPITATION: &str = "Provider Capitation Queries";
const HEALTH: &str = "Health Check Queries";
const OTHER: &str = "Other Queries";

/// `**N. Title**` starts a query, `* text` sets its description, `"text"` its query.
pub fn parse_samples(text: &str) -> Vec<SampleQuery> {
    let mut queries = Vec::new();
    let mut current: Option<SampleQuery> = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(title) = numbered_title(line) {
            if let Some(q) = current.take() {
                queries.push(q);
            }
            current = Some(SampleQuery {
                title,
                ..SampleQuery::default()
            });
        } else if let Some(q) = current.as_mut() {
            if let Some(rest) = trimmed.strip_prefix('*') {
                q.description = rest.trim().to_string();
            } else if let Some(rest) = trimmed.strip_prefix('"') {
                q.query = rest.strip_suffix('"').unwrap_or(rest).to_string();
            }
        }
    }
    if let Some(q) = current {
        queries.push(q);
    }
    queries
}

/// `**12. Title**` → "Title". The line must start with `**` followed by digits and a dot.
fn numbered_title(line: &str) -> Option<String> {
    let rest = line.strip_prefix("**")?;
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = rest[digits..].strip_prefix('.')?;
    let title = rest.trim_start();
    Some(title.strip_suffix("**").unwrap_or(title).to_string())
}

/// Bucket queries by keywords; empty buckets are dropped, order is fixed.
pub fn categorize(queries: Vec<SampleQuery>) -> Vec<QueryCategory> {
    let mut buckets: [(&'static str, Vec<SampleQuery>); 3] =
        [(CAPITATION, Vec::new()), (HEALTH, Vec::new()), (OTHER, Vec::new())];
    for q in queries {
        let title = q.title.to_lowercase();
        let desc = q.description.to_lowercase();
        let text = q.query.to_lowercase();
        let idx = if ["capitation", "provider", "report"].iter().any(|k| title.contains(k))
            || desc.contains("capitation")
            || text.contains("capitation")
        {
            0
        } else if ["health", "check", "status"].iter().any(|k| title.contains(k))
            || desc.contains("health")
            || text.contains("health")
        {
            1
        } else {
            2
        };
        buckets[idx].1.push(q);
    }
    buckets
        .into_iter()
        .filter(|(_, qs)| !qs.is_empty())
        .map(|(name, queries)| QueryCategory { name, queries })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStyle {
    #[default]
    Arrow,
    Checkmark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarSection {
    pub id: String,
    #[serde(default = "default_section_title")]
    pub title: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default = "default_true")]
    pub expanded: bool,
    #[serde(default)]
    pub toggle_style: ToggleStyle,
    #[serde(default)]
    pub items: Vec<SidebarItem>,
}

fn default_icon() -> String {
    "📄".to_string()
}

fn default_section_title() -> String {
    "Menu".to_string()
}

fn default_true() -> bool {
    true
}

impl SidebarSection {
    /// Glyph on the section header; `None` when the section cannot collapse.
    pub fn toggle_icon(&self) -> Option<&'static str> {
        if !self.collapsible {
            return None;
        }
        Some(match (self.toggle_style, self.expanded) {
            (ToggleStyle::Checkmark, _) => "✓",
            (ToggleStyle::Arrow, true) => "▼",
            (ToggleStyle::Arrow, false) => "▶",
        })
    }

    /// Flip expansion. Non-collapsible sections stay as they are.
    pub fn toggle(&mut self) {
        if self.collapsible {
            self.expanded = !self.expanded;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarConfig {
    pub sections: Vec<SidebarSection>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusConfiguration {
    #[serde(default)]
    pub current_approach: String,
    #[serde(default)]
    pub sidebar_items_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub status: Option<String>,
    pub configuration: StatusConfiguration,
}

impl SystemStatus {
    pub fn approach_label(&self) -> &'static str {
        match self.configuration.current_approach.as_str() {
            "intent_only" => "🎯 Intent Classification Only",
            "groq_only" => "🤖 Groq LLM Only",
            "qwen_only" => "🧠 QWEN LLM Only",
            "multiple_enabled" => "🔄 Multiple Approaches Enabled",
            "llm_only" => "🤖 LLM Processing Only",
            "both_enabled" => "🔄 Both Approaches Enabled",
            _ => "❌ No Approach Enabled",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SamplesResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    samples: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the three catalog endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::Api(format!("{} {}", status, body)));
        }
        Ok(res.json().await?)
    }

    /// GET /api/samples: parsed and categorized.
    pub async fn samples(&self) -> Result<Vec<QueryCategory>, CatalogError> {
        let data: SamplesResponse = self.get_json("/api/samples").await?;
        match (data.success, data.samples.as_str()) {
            (true, Some(text)) => Ok(categorize(parse_samples(text))),
            _ => Err(CatalogError::Api(
                data.error.unwrap_or_else(|| "samples unavailable".to_string()),
            )),
        }
    }

    /// GET /api/sidebar-config.
    pub async fn sidebar(&self) -> Result<SidebarConfig, CatalogError> {
        self.get_json("/api/sidebar-config").await
    }

    /// GET /api/system-status.
    pub async fn system_status(&self) -> Result<SystemStatus, CatalogError> {
        self.get_json("/api/system-status").await
    }
}
