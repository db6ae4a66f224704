//! Shared value types for the orchestration domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! data that flows between stages: the keyed inputs and outputs of task units
//! and the structured error record the router classifies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CapabilityError, CapabilityName, PlanParseError};

// ---------------------------------------------------------------------------
// Error records
// ---------------------------------------------------------------------------

/// Classification of a step failure.
///
/// Serialised in `SCREAMING_SNAKE_CASE` because the record is embedded verbatim
/// in replanning prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// The cursor points past the end of the plan.
    OutOfRange,
    /// A capability failed while running.
    ExecutionError,
    /// A capability broke its output contract.
    ParseError,
}

impl ErrorType {
    /// Returns `true` if a new plan could plausibly avoid this failure.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::ExecutionError)
    }

    /// Returns the wire label (e.g. `"OUT_OF_RANGE"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::ParseError => "PARSE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Structured record of the most recent step failure.
///
/// Set by the step runner on failure, cleared on the next successful step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Failure classification.
    pub error_type: ErrorType,
    /// Human-readable description.
    pub message: String,
    /// The step id that failed, or the cursor value for out-of-range failures.
    pub step: u64,
    /// The capability that was dispatched, when dispatch was attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<CapabilityName>,
}

impl ErrorInfo {
    /// Record for a cursor that points past the plan.
    pub fn out_of_range(cursor: usize, plan_len: usize) -> Self {
        Self {
            error_type: ErrorType::OutOfRange,
            message: format!("step {cursor} is out of range (plan has {plan_len} steps)"),
            step: cursor as u64,
            task_name: None,
        }
    }

    /// Record for a planned step that cannot run as written.
    pub fn from_plan_violation(error: &PlanParseError, step: u64) -> Self {
        Self {
            error_type: ErrorType::ExecutionError,
            message: error.to_string(),
            step,
            task_name: None,
        }
    }

    /// Record for a failed dispatch of `task_name` at `step`.
    pub fn from_capability_error(
        error: &CapabilityError,
        step: u64,
        task_name: CapabilityName,
    ) -> Self {
        Self {
            error_type: error.error_type(),
            message: error.to_string(),
            step,
            task_name: Some(task_name),
        }
    }
}

// ---------------------------------------------------------------------------
// Step inputs and outputs
// ---------------------------------------------------------------------------

/// Keyed input handed to a capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepInput(Map<String, Value>);

impl StepInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`, replacing any earlier binding.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the raw value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the number of bound keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `key` is bound (even to `null`).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the value bound to `key` as a non-empty string.
    ///
    /// Nulls, empty strings and non-string values count as absent, so callers
    /// can chain fallbacks with `or_else`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Returns the value bound to `key` as an unsigned integer, accepting
    /// either a JSON number or a numeric string.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ---------------------------------------------------------------------------

/// Keyed result produced by a capability and stored under its step id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepOutput(Map<String, Value>);

impl StepOutput {
    /// Wraps a capability's raw output, rejecting anything that is not a JSON
    /// object.
    pub fn from_value(value: Value) -> Result<Self, CapabilityError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CapabilityError::MalformedOutput {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Returns the value of `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns `true` if any of `keys` is present.
    pub fn has_any_key(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.0.contains_key(*k))
    }

    /// Returns the non-fatal warnings listed under `error_messages`.
    ///
    /// Non-string entries are rendered as compact JSON rather than dropped.
    pub fn error_messages(&self) -> Vec<String> {
        match self.0.get("error_messages") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds elapsed since this timestamp.
    pub fn elapsed_ms(self) -> i64 {
        (Utc::now() - self.0).num_milliseconds()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_info_serialises_with_wire_labels() {
        let info = ErrorInfo::from_capability_error(
            &CapabilityError::failed("upstream timeout"),
            2,
            CapabilityName::ScenarioClassifier,
        );
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            json!({
                "error_type": "EXECUTION_ERROR",
                "message": "upstream timeout",
                "step": 2,
                "task_name": "scenario_classifier"
            })
        );
    }

    #[test]
    fn out_of_range_omits_task_name() {
        let value = serde_json::to_value(ErrorInfo::out_of_range(4, 3)).unwrap();
        assert_eq!(value["error_type"], "OUT_OF_RANGE");
        assert_eq!(value["step"], 4);
        assert!(value.get("task_name").is_none());
    }

    #[test]
    fn plan_violations_are_execution_errors_without_a_task() {
        let err = PlanParseError::UnknownCapability {
            step: 2,
            name: "restaurant_lookup".into(),
        };
        let info = ErrorInfo::from_plan_violation(&err, 2);
        assert_eq!(info.error_type, ErrorType::ExecutionError);
        assert_eq!(info.step, 2);
        assert!(info.message.contains("restaurant_lookup"));
        assert_eq!(info.task_name, None);
    }

    #[test]
    fn only_execution_errors_are_recoverable() {
        assert!(ErrorType::ExecutionError.is_recoverable());
        assert!(!ErrorType::OutOfRange.is_recoverable());
        assert!(!ErrorType::ParseError.is_recoverable());
    }

    #[test]
    fn step_output_rejects_non_objects() {
        let err = StepOutput::from_value(json!(["a", "b"])).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ParseError);
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn step_output_reads_error_messages() {
        let output =
            StepOutput::from_value(json!({"city": "北京", "error_messages": ["a", 7]})).unwrap();
        assert_eq!(output.error_messages(), vec!["a".to_string(), "7".to_string()]);
        assert!(output.has_any_key(&["city", "location"]));
        assert!(!output.has_any_key(&["search_results"]));
    }

    #[test]
    fn step_input_accessors_treat_blank_values_as_absent() {
        let mut input = StepInput::new();
        input.insert("keywords", json!(""));
        input.insert("query", json!("川菜"));
        input.insert("pages", json!("3"));
        input.insert("offset", json!(25));

        assert_eq!(input.get_str("keywords"), None);
        assert_eq!(
            input.get_str("keywords").or_else(|| input.get_str("query")),
            Some("川菜")
        );
        assert_eq!(input.get_u64("pages"), Some(3));
        assert_eq!(input.get_u64("offset"), Some(25));
        assert!(input.contains_key("keywords"));
    }
}
