//! Aggregation of step results into the final recommendation payload.
//!
//! Results are matched by *shape* rather than by step id: the first result
//! carrying any key of a shape supplies that shape's fields. Two steps that
//! produce the same shape cannot be told apart; the earlier one wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{StepId, StepOutput};

const SCENARIO_SHAPE: &[&str] = &["scenario", "types"];
const LOCATION_SHAPE: &[&str] = &["city", "location"];
const SEARCH_SHAPE: &[&str] = &["search_results"];

/// The final response payload of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    /// The original request.
    pub query: String,
    /// Dining scenario, when classified.
    pub scenario: Value,
    /// AMap type code for the scenario.
    pub types: Value,
    /// Resolved city.
    pub city: Value,
    /// Resolved coordinates (`"lng,lat"`).
    pub location: Value,
    /// Length of `restaurants`.
    pub restaurant_count: usize,
    /// Search hits, as returned by the search step.
    pub restaurants: Vec<Value>,
    /// Every non-fatal warning from every step, in step order.
    pub errors: Vec<String>,
}

impl RecommendationPayload {
    /// Aggregates `step_results` for `query`.
    pub fn from_step_results(query: &str, step_results: &BTreeMap<StepId, StepOutput>) -> Self {
        let scenario = find_by_shape(step_results, SCENARIO_SHAPE);
        let location = find_by_shape(step_results, LOCATION_SHAPE);
        let search = find_by_shape(step_results, SEARCH_SHAPE);

        let restaurants = match search.and_then(|r| r.get("search_results")) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        Self {
            query: query.to_owned(),
            scenario: field(scenario, "scenario"),
            types: field(scenario, "types"),
            city: field(location, "city"),
            location: field(location, "location"),
            restaurant_count: restaurants.len(),
            restaurants,
            errors: aggregate_errors(step_results),
        }
    }
}

/// Returns the first result (in step order) that carries any of `keys`.
pub fn find_by_shape<'a>(
    step_results: &'a BTreeMap<StepId, StepOutput>,
    keys: &[&str],
) -> Option<&'a StepOutput> {
    step_results.values().find(|r| r.has_any_key(keys))
}

/// Concatenates every result's `error_messages`, in step order.
pub fn aggregate_errors(step_results: &BTreeMap<StepId, StepOutput>) -> Vec<String> {
    step_results
        .values()
        .flat_map(StepOutput::error_messages)
        .collect()
}

fn field(result: Option<&StepOutput>, name: &str) -> Value {
    result
        .and_then(|r| r.get(name))
        .cloned()
        .unwrap_or(Value::Null)
}
