use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Connection settings handed to the transport at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    New,
    Resume,
    List,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::New => "New Diagnosis",
            Mode::Resume => "Resume Diagnosis",
            Mode::List => "List Sessions",
        }
    }

    /// Next mode in tab order.
    pub fn next(self) -> Mode {
        match self {
            Mode::New => Mode::Resume,
            Mode::Resume => Mode::List,
            Mode::List => Mode::New,
        }
    }
}

/// Normalized output of a start or resume call.
///
/// Every field may be missing: absence means the agent has not produced it yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub updates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_of_thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
    /// Any other keys the backend returned, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowResult {
    /// Thread identifier, if present and non-empty.
    pub fn addressable_thread(&self) -> Option<&str> {
        self.thread_id.as_deref().filter(|t| !t.is_empty())
    }
}

fn null_as_empty<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
}

/// One historical session record. The backend owns its schema.
pub type SessionSummary = Map<String, Value>;

/// Collection name to the document persisted in it during the current run.
pub type RunDocumentMap = BTreeMap<String, Value>;

/// Events published by the controller to presentation layers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Snapshot(Box<crate::workflow::Snapshot>),
    Info(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workflow_result_tolerates_missing_and_null_fields() {
        let r: WorkflowResult = serde_json::from_value(json!({ "updates": null })).unwrap();
        assert!(r.updates.is_empty());
        assert!(r.chain_of_thought.is_none());
        assert!(r.addressable_thread().is_none());

        let r: WorkflowResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(r, WorkflowResult::default());
    }

    #[test]
    fn workflow_result_keeps_unknown_keys() {
        let r: WorkflowResult = serde_json::from_value(json!({
            "updates": ["step1"],
            "thread_id": "t-1",
            "telemetry_data": [{"oil_pressure": "30"}]
        }))
        .unwrap();
        assert_eq!(r.addressable_thread(), Some("t-1"));
        assert!(r.extra.contains_key("telemetry_data"));
        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["telemetry_data"][0]["oil_pressure"], "30");
    }

    #[test]
    fn empty_thread_id_is_not_addressable() {
        let r = WorkflowResult {
            thread_id: Some(String::new()),
            ..Default::default()
        };
        assert!(r.addressable_thread().is_none());
    }

    #[test]
    fn modes_cycle() {
        assert_eq!(Mode::New.next().next().next(), Mode::New);
    }
}
