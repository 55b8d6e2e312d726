use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Concrete values to run an actor with.
pub type RunnableInput = Map<String, Value>;

/// Caller-supplied bearer token. Lives for one request only.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Returns `None` for absent or blank keys.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self(SecretString::from(raw.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Short, non-sensitive prefix for diagnostics.
    pub fn prefix(&self) -> String {
        let head: String = self.expose().chars().take(8).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.prefix()).finish()
    }
}

// The shape of a published input contract (the JSON-schema-like document
// the platform stores next to an actor).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    // title, description, schemaVersion... kept for interactive editing
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputSchema {
    /// Lenient parse: `None` when the value does not look like a schema.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Schemas sometimes arrive as serialized text instead of an object.
    pub fn from_text(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn has_fields(&self) -> bool {
        !self.properties.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lifecycle status reported by the platform for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    TimingOut,
    TimedOut,
    Aborting,
    Aborted,
    Other(String),
}

impl RunStatus {
    /// Still owned by the platform scheduler; keep waiting.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Ready | RunStatus::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Ready => "READY",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::TimingOut => "TIMING-OUT",
            RunStatus::TimedOut => "TIMED-OUT",
            RunStatus::Aborting => "ABORTING",
            RunStatus::Aborted => "ABORTED",
            RunStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "READY" => RunStatus::Ready,
            "RUNNING" => RunStatus::Running,
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "TIMING-OUT" => RunStatus::TimingOut,
            "TIMED-OUT" => RunStatus::TimedOut,
            "ABORTING" => RunStatus::Aborting,
            "ABORTED" => RunStatus::Aborted,
            _ => RunStatus::Other(raw),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run as last reported by the platform. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dataset_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_key_value_store_id: Option<String>,

    // Present on full run records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_debug_only_shows_prefix() {
        let cred = Credential::parse(Some("apify_api_SUPERSECRETVALUE")).unwrap();
        let printed = format!("{cred:?}");
        assert!(printed.contains("apify_ap..."));
        assert!(!printed.contains("SUPERSECRET"));
    }

    #[test]
    fn blank_credential_is_absent() {
        assert!(Credential::parse(None).is_none());
        assert!(Credential::parse(Some("   ")).is_none());
    }

    #[test]
    fn unknown_status_keeps_raw_text() {
        let record: RunRecord =
            serde_json::from_value(json!({ "id": "r1", "status": "PAUSED" })).unwrap();
        assert_eq!(record.status, RunStatus::Other("PAUSED".into()));
        assert!(!record.status.is_active());
        assert_eq!(record.status.to_string(), "PAUSED");
    }

    #[test]
    fn schema_keeps_editor_metadata() {
        let schema = InputSchema::from_value(json!({
            "title": "Crawler input",
            "properties": {
                "maxPages": { "type": "integer", "default": 10, "editor": "number" }
            },
            "required": ["maxPages"]
        }))
        .unwrap();

        assert!(schema.has_fields());
        assert_eq!(schema.extra["title"], "Crawler input");
        let field = &schema.properties["maxPages"];
        assert_eq!(field.kind.as_deref(), Some("integer"));
        assert_eq!(field.extra["editor"], "number");
    }

    #[test]
    fn non_object_properties_is_not_a_schema() {
        assert!(InputSchema::from_value(json!({ "properties": "nope" })).is_none());
        assert!(InputSchema::from_text("{ not json").is_none());
    }
}
