//! Input binding: turning a step's `input_mapping` into a concrete [`StepInput`].

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::{InputSource, PlanStep, StepId, StepInput, StepOutput};

/// Parameter every task unit can fall back on.
pub const QUERY_PARAM: &str = "query";

/// Builds the input for `step` from earlier results.
///
/// - No mapping: the input is `{query}`.
/// - `step_<N>.<field>` sources bind the field's value; a missing step result
///   or field skips the parameter with a warning.
/// - Literal sources bind as-is.
/// - If nothing bound `query`, the original query is injected.
pub fn resolve_step_input(
    step: &PlanStep,
    step_results: &BTreeMap<StepId, StepOutput>,
    query: &str,
) -> StepInput {
    let mut input = StepInput::new();

    let Some(mapping) = &step.input_mapping else {
        input.insert(QUERY_PARAM, Value::String(query.to_owned()));
        return input;
    };

    for (parameter, source) in mapping {
        match source {
            InputSource::Literal(value) => input.insert(parameter.clone(), value.clone()),
            InputSource::StepField(reference) => {
                let Some(result) = step_results.get(&reference.step_id) else {
                    warn!(
                        step_id = %step.step_id,
                        parameter = %parameter,
                        source = %reference,
                        "referenced step has no result; parameter skipped"
                    );
                    continue;
                };
                match result.get(reference.field.as_str()) {
                    Some(value) => input.insert(parameter.clone(), value.clone()),
                    None => warn!(
                        step_id = %step.step_id,
                        parameter = %parameter,
                        source = %reference,
                        "referenced field missing from step result; parameter skipped"
                    ),
                }
            }
        }
    }

    if !input.contains_key(QUERY_PARAM) {
        input.insert(QUERY_PARAM, Value::String(query.to_owned()));
    }
    input
}
