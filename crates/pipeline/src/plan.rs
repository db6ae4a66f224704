//! Plan model and oracle-output parsing.
//!
//! A [`Plan`] is built once per planning cycle from the oracle's JSON and is
//! never mutated afterwards; a replan supersedes it with a new value.
//! Everything the step runner needs is checked here, before the first
//! dispatch:
//!
//! - step ids are `1..=n` in list order,
//! - every `task_name` is registered in the [`CapabilityCatalog`],
//! - every `step_<N>.<field>` reference is well-formed and points backwards.
//!
//! The last two are step-level violations; the planner turns them into a
//! step error rather than ending the run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CapabilityCatalog, CapabilityName, FieldName, PlanParseError, StepId};

// ---------------------------------------------------------------------------
// Data-flow references
// ---------------------------------------------------------------------------

/// A reference to one field of an earlier step's result: `step_<N>.<field>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    /// The producing step.
    pub step_id: StepId,
    /// The field inside its keyed result.
    pub field: FieldName,
}

impl SourceRef {
    /// Prefix that marks a mapping value as a step reference.
    pub const PREFIX: &'static str = "step_";

    /// Parses `step_<N>.<field>`; `None` if `text` does not have exactly that form.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(Self::PREFIX)?;
        let (id, field) = rest.split_once('.')?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || field.contains('.') {
            return None;
        }
        Some(Self {
            step_id: StepId::new(id.parse().ok()?)?,
            field: FieldName::new(field)?,
        })
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}.{}", Self::PREFIX, self.step_id, self.field)
    }
}

/// Where a step parameter takes its value from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InputSource {
    /// A field of an earlier step's result.
    StepField(SourceRef),
    /// A value used as-is.
    Literal(Value),
}

impl InputSource {
    /// Classifies a raw mapping value.
    ///
    /// Strings that start with [`SourceRef::PREFIX`] must be valid references;
    /// on failure the offending text is returned. Every other value is a literal.
    pub fn parse(value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) if text.starts_with(SourceRef::PREFIX) => {
                SourceRef::parse(&text).map(Self::StepField).ok_or(text)
            }
            other => Ok(Self::Literal(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One unit of work in a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    /// Position in the plan, starting at 1.
    pub step_id: StepId,
    /// The capability that executes this step.
    pub task_name: CapabilityName,
    /// Short description written by the oracle.
    pub description: String,
    /// Parameter bindings; `None` means "pass the original query".
    pub input_mapping: Option<BTreeMap<String, InputSource>>,
}

/// An ordered, validated sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    /// The steps in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false` for a validated plan.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolves a 1-indexed cursor to its step.
    pub fn step_at(&self, cursor: usize) -> Option<&PlanStep> {
        cursor.checked_sub(1).and_then(|i| self.steps.get(i))
    }
}

/// A validated plan together with the exact JSON object the oracle returned.
///
/// The raw object is what gets recorded in plan history, so later replanning
/// prompts show the oracle its own words.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlan {
    /// The typed plan.
    pub plan: Plan,
    /// The oracle's JSON, verbatim.
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    steps: Vec<RawPlanStep>,
}

#[derive(Debug, Deserialize)]
struct RawPlanStep {
    step_id: u64,
    #[serde(alias = "subgraph_name")]
    task_name: String,
    description: String,
    #[serde(default)]
    input_mapping: Option<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Removes a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parses and validates the oracle's planning response.
pub fn parse_plan_response(
    text: &str,
    catalog: &CapabilityCatalog,
) -> Result<ParsedPlan, PlanParseError> {
    let body = strip_code_fences(text);
    let raw: Value = serde_json::from_str(body).map_err(|e| PlanParseError::InvalidJson {
        message: e.to_string(),
    })?;
    let shaped: RawPlan =
        serde_json::from_value(raw.clone()).map_err(|e| PlanParseError::InvalidShape {
            message: e.to_string(),
        })?;
    let plan = validate(shaped, catalog)?;
    Ok(ParsedPlan { plan, raw })
}

fn validate(raw: RawPlan, catalog: &CapabilityCatalog) -> Result<Plan, PlanParseError> {
    if raw.steps.is_empty() {
        return Err(PlanParseError::EmptyPlan);
    }

    let mut steps = Vec::with_capacity(raw.steps.len());
    for (index, step) in raw.steps.into_iter().enumerate() {
        let expected = index as u64 + 1;
        let step_id = StepId::new(step.step_id)
            .filter(|id| id.as_u64() == expected)
            .ok_or(PlanParseError::NonContiguousStepIds {
                expected,
                found: step.step_id,
            })?;

        let task_name = CapabilityName::from_name(&step.task_name)
            .filter(|name| catalog.contains(*name))
            .ok_or_else(|| PlanParseError::UnknownCapability {
                step: expected,
                name: step.task_name.clone(),
            })?;

        let input_mapping = step
            .input_mapping
            .map(|mapping| validate_mapping(step_id, mapping))
            .transpose()?;

        steps.push(PlanStep {
            step_id,
            task_name,
            description: step.description,
            input_mapping,
        });
    }

    Ok(Plan { steps })
}

fn validate_mapping(
    step_id: StepId,
    mapping: Map<String, Value>,
) -> Result<BTreeMap<String, InputSource>, PlanParseError> {
    let mut bound = BTreeMap::new();
    for (parameter, value) in mapping {
        let source =
            InputSource::parse(value).map_err(|reference| PlanParseError::MalformedReference {
                step: step_id.as_u64(),
                parameter: parameter.clone(),
                reference,
            })?;
        if let InputSource::StepField(reference) = &source {
            if reference.step_id >= step_id {
                return Err(PlanParseError::ForwardReference {
                    step: step_id.as_u64(),
                    parameter,
                    referenced: reference.step_id.as_u64(),
                });
            }
        }
        bound.insert(parameter, source);
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, CapabilityError, StepInput};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Stub(CapabilityName);

    #[async_trait]
    impl Capability for Stub {
        fn name(&self) -> CapabilityName {
            self.0
        }

        async fn invoke(&self, _input: StepInput) -> Result<Value, CapabilityError> {
            Ok(json!({}))
        }
    }

    fn full_catalog() -> CapabilityCatalog {
        CapabilityName::ALL
            .into_iter()
            .fold(CapabilityCatalog::new(), |c, name| c.with(Arc::new(Stub(name))))
    }

    const THREE_STEP_PLAN: &str = r#"{
        "steps": [
            {"step_id": 1, "task_name": "parse_query", "description": "resolve city", "input_mapping": null},
            {"step_id": 2, "task_name": "scenario_classifier", "description": "classify", "input_mapping": {"query": "step_1.query"}},
            {"step_id": 3, "task_name": "food_search", "description": "search", "input_mapping": {
                "keywords": "step_2.scenario",
                "city": "step_1.city",
                "location": "step_1.location",
                "types": "step_2.types",
                "pages": 2
            }}
        ]
    }"#;

    #[test]
    fn strips_json_and_bare_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parses_a_fenced_three_step_plan() {
        let text = format!("```json\n{THREE_STEP_PLAN}\n```");
        let parsed = parse_plan_response(&text, &full_catalog()).unwrap();
        let plan = &parsed.plan;

        assert_eq!(plan.len(), 3);
        assert!(!plan.is_empty());
        assert_eq!(plan.steps()[0].task_name, CapabilityName::ParseQuery);
        assert!(plan.steps()[0].input_mapping.is_none());

        let search = plan.step_at(3).unwrap();
        let mapping = search.input_mapping.as_ref().unwrap();
        assert_eq!(
            mapping["city"],
            InputSource::StepField(SourceRef::parse("step_1.city").unwrap())
        );
        assert_eq!(mapping["pages"], InputSource::Literal(json!(2)));
        assert_eq!(parsed.raw["steps"][2]["task_name"], "food_search");
    }

    #[test]
    fn accepts_legacy_subgraph_name_key() {
        let text = r#"{"steps":[{"step_id":1,"subgraph_name":"parse_query","description":"d"}]}"#;
        let parsed = parse_plan_response(text, &full_catalog()).unwrap();
        assert_eq!(parsed.plan.steps()[0].task_name, CapabilityName::ParseQuery);
    }

    #[test]
    fn rejects_text_that_is_not_json() {
        let err = parse_plan_response("Sure! Here is your plan.", &full_catalog()).unwrap_err();
        assert!(matches!(err, PlanParseError::InvalidJson { .. }));
    }

    #[test]
    fn rejects_json_without_steps() {
        let err = parse_plan_response(r#"{"plan": []}"#, &full_catalog()).unwrap_err();
        assert!(matches!(err, PlanParseError::InvalidShape { .. }));
    }

    #[test]
    fn rejects_empty_and_non_contiguous_plans() {
        assert_eq!(
            parse_plan_response(r#"{"steps": []}"#, &full_catalog()).unwrap_err(),
            PlanParseError::EmptyPlan
        );
        let gap = r#"{"steps":[
            {"step_id":1,"task_name":"parse_query","description":"a"},
            {"step_id":3,"task_name":"food_search","description":"b"}]}"#;
        assert_eq!(
            parse_plan_response(gap, &full_catalog()).unwrap_err(),
            PlanParseError::NonContiguousStepIds {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_unknown_and_unregistered_capabilities() {
        let unknown = r#"{"steps":[{"step_id":1,"task_name":"search_restaurants","description":"a"}]}"#;
        assert_eq!(
            parse_plan_response(unknown, &full_catalog()).unwrap_err(),
            PlanParseError::UnknownCapability {
                step: 1,
                name: "search_restaurants".into()
            }
        );

        let partial = CapabilityCatalog::new().with(Arc::new(Stub(CapabilityName::ParseQuery)));
        let unregistered = r#"{"steps":[{"step_id":1,"task_name":"food_search","description":"a"}]}"#;
        assert!(matches!(
            parse_plan_response(unregistered, &partial).unwrap_err(),
            PlanParseError::UnknownCapability { .. }
        ));
    }

    #[test]
    fn rejects_malformed_and_forward_references() {
        let malformed = r#"{"steps":[
            {"step_id":1,"task_name":"parse_query","description":"a"},
            {"step_id":2,"task_name":"food_search","description":"b","input_mapping":{"city":"step_one.city"}}]}"#;
        assert_eq!(
            parse_plan_response(malformed, &full_catalog()).unwrap_err(),
            PlanParseError::MalformedReference {
                step: 2,
                parameter: "city".into(),
                reference: "step_one.city".into()
            }
        );

        let forward = r#"{"steps":[
            {"step_id":1,"task_name":"parse_query","description":"a","input_mapping":{"types":"step_2.types"}},
            {"step_id":2,"task_name":"scenario_classifier","description":"b"}]}"#;
        assert_eq!(
            parse_plan_response(forward, &full_catalog()).unwrap_err(),
            PlanParseError::ForwardReference {
                step: 1,
                parameter: "types".into(),
                referenced: 2
            }
        );
    }

    #[test]
    fn source_ref_parsing_is_strict() {
        let r = SourceRef::parse("step_12.location").unwrap();
        assert_eq!(r.step_id.as_u64(), 12);
        assert_eq!(r.field.as_str(), "location");
        assert_eq!(r.to_string(), "step_12.location");

        for bad in ["step_.city", "step_0.city", "step_1", "step_1.", "step_1.a.b", "step_x.city"] {
            assert!(SourceRef::parse(bad).is_none(), "{bad} should not parse");
        }
    }

    #[test]
    fn non_reference_strings_are_literals() {
        assert_eq!(
            InputSource::parse(json!("北京")).unwrap(),
            InputSource::Literal(json!("北京"))
        );
        assert_eq!(
            InputSource::parse(json!("step_9")).unwrap_err(),
            "step_9".to_string()
        );
    }
}
