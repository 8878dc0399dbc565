//! Write-once accumulator of stage outputs for a single comparison run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RedlineError, Result};

/// Output of one stage (or one input document).
///
/// Serialized untagged, so a JSON string always means text; `Structured` never
/// holds a bare string and the state dump reads back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    /// Plain text: documents, markdown output, or a reply that was not valid JSON
    Text(String),
    /// A parsed JSON value other than a string
    Structured(Value),
}

impl StageValue {
    /// Text substituted into downstream prompts; structured values become compact JSON
    pub fn as_prompt_text(&self) -> String {
        match self {
            StageValue::Text(text) => text.clone(),
            StageValue::Structured(value) => value.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StageValue::Text(text) => Some(text),
            StageValue::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            StageValue::Structured(value) => Some(value),
            StageValue::Text(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, StageValue::Structured(_))
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_prompt_text())
    }
}

impl From<String> for StageValue {
    fn from(text: String) -> Self {
        StageValue::Text(text)
    }
}

impl From<&str> for StageValue {
    fn from(text: &str) -> Self {
        StageValue::Text(text.to_string())
    }
}

impl From<Value> for StageValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => StageValue::Text(text),
            other => StageValue::Structured(other),
        }
    }
}

/// Keys are write-once: once set, a value can be read but never replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineState {
    values: BTreeMap<String, StageValue>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value, failing if the key was never written
    pub fn get(&self, key: &str) -> Result<&StageValue> {
        self.values
            .get(key)
            .ok_or_else(|| RedlineError::KeyNotFound(key.to_string()))
    }

    /// Write a value, failing if the key is already present
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<StageValue>) -> Result<()> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(RedlineError::KeyAlreadySet(key));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get() {
        let mut state = PipelineState::new();
        state.set("doc1", "Rate: $150 per hour").unwrap();

        assert_eq!(state.get("doc1").unwrap().as_text(), Some("Rate: $150 per hour"));
        assert!(state.contains("doc1"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let state = PipelineState::new();
        assert!(matches!(state.get("summary"), Err(RedlineError::KeyNotFound(k)) if k == "summary"));
    }

    #[test]
    fn test_set_twice_fails_regardless_of_value() {
        let mut state = PipelineState::new();
        state.set("summary", "first").unwrap();

        let same = state.set("summary", "first");
        let different = state.set("summary", json!({ "other": true }));

        assert!(matches!(same, Err(RedlineError::KeyAlreadySet(_))));
        assert!(matches!(different, Err(RedlineError::KeyAlreadySet(_))));
        assert_eq!(state.get("summary").unwrap().as_text(), Some("first"));
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut state = PipelineState::new();
        state.set("summary", "s").unwrap();
        state.set("doc2", "b").unwrap();
        state.set("doc1", "a").unwrap();

        let keys: Vec<&str> = state.keys().collect();
        assert_eq!(keys, vec!["doc1", "doc2", "summary"]);
    }

    #[test]
    fn test_structured_prompt_text_is_compact_json() {
        let value = StageValue::from(json!({ "added_sections": [] }));
        assert!(value.is_structured());
        assert_eq!(value.as_prompt_text(), r#"{"added_sections":[]}"#);
        assert_eq!(value.to_string(), value.as_prompt_text());
    }

    #[test]
    fn test_json_string_becomes_text() {
        assert_eq!(StageValue::from(json!("plain")), StageValue::Text("plain".to_string()));
        assert!(StageValue::from(json!(42)).is_structured());
    }

    #[test]
    fn test_state_dump_reads_back_every_variant() {
        let mut state = PipelineState::new();
        state.set("doc1", "text").unwrap();
        state.set("final_comparison", json!("quoted reply")).unwrap();
        state.set("risk_analysis", json!({ "legal_risks": [] })).unwrap();
        state.set("score", json!(3)).unwrap();

        let dump = serde_json::to_string(&state).unwrap();
        let restored: PipelineState = serde_json::from_str(&dump).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn test_state_serializes_as_flat_map() {
        let mut state = PipelineState::new();
        state.set("doc1", "text").unwrap();
        state.set("risk_analysis", json!({ "legal_risks": [] })).unwrap();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["doc1"], "text");
        assert!(json["risk_analysis"]["legal_risks"].is_array());

        let restored: PipelineState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }
}
