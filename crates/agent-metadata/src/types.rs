use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state shared by agents and presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    #[default]
    Idle,
    Inactive,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown agent status: {other}")),
        }
    }
}

/// An MCP tool enabled for a preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledMcp {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    #[serde(default)]
    pub enabled_resources: Vec<String>,
    #[serde(default)]
    pub enabled_prompts: Vec<String>,
}

/// Preset snapshot embedded by value in each agent record.
///
/// Unknown fields are preserved through `extra` so records written by newer
/// builds survive a read-modify-write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub enabled_mcps: Vec<EnabledMcp>,
    #[serde(default)]
    pub llm_bridge_name: String,
    #[serde(default)]
    pub llm_bridge_config: Map<String, Value>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub knowledge_document_count: u64,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A persisted agent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    pub id: String,
    /// Monotonic counter used for optimistic concurrency
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub preset: Preset,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub session_count: u64,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Input for creating an agent. Id, version and counters are assigned by the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub preset: Preset,
    #[serde(default)]
    pub status: AgentStatus,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl AgentMetadataPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply_to(self, target: &mut AgentMetadata) {
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(description) = self.description {
            target.description = description;
        }
        if let Some(icon) = self.icon {
            target.icon = icon;
        }
        if let Some(keywords) = self.keywords {
            target.keywords = keywords;
        }
        if let Some(preset) = self.preset {
            target.preset = preset;
        }
        if let Some(status) = self.status {
            target.status = status;
        }
        if let Some(last_used) = self.last_used {
            target.last_used = Some(last_used);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    /// Reject the update unless the stored version equals this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<String>,
}

impl UpdateOptions {
    pub fn expecting(version: impl Into<String>) -> Self {
        Self {
            expected_version: Some(version.into()),
        }
    }
}

/// In-memory filter. All provided predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    /// Case-insensitive substring of the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Case-insensitive substring of the description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// At least one keyword must match, ignoring case
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl AgentSearchQuery {
    #[must_use]
    pub fn matches(&self, meta: &AgentMetadata) -> bool {
        if self.status.is_some_and(|status| status != meta.status) {
            return false;
        }
        if let Some(name) = non_blank(self.name.as_deref()) {
            if !contains_ignore_case(&meta.name, name) {
                return false;
            }
        }
        if let Some(description) = non_blank(self.description.as_deref()) {
            if !contains_ignore_case(&meta.description, description) {
                return false;
            }
        }
        if !self.keywords.is_empty() {
            let wanted: Vec<String> = self.keywords.iter().map(|k| k.to_lowercase()).collect();
            let hit = meta
                .keywords
                .iter()
                .any(|k| wanted.contains(&k.to_lowercase()));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
