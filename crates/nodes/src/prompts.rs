//! Planner prompt text.
//!
//! Templates use `{name}` placeholders filled by [`render`].

pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are a restaurant recommendation planning expert. Your job is to break a user's food recommendation request into an ordered list of executable steps.

Each step calls exactly one task unit from the catalog supplied in the user message. Consider the data flow between steps.

## Output format
Return one JSON object and nothing else:
{
    "steps": [
        {
            "step_id": 1,
            "task_name": "task unit name",
            "description": "short description of this step",
            "input_mapping": {
                "parameter": "step_X.output_field"
            }
        }
    ]
}

## Rules
- step_id starts at 1 and increases by 1.
- task_name must be one of the catalog keys, spelled exactly.
- input_mapping is optional (use null). A value of the form "step_X.field" takes `field` from the output of step X, which must be an earlier step. Any other value is passed through unchanged.
- The usual order is parse_query -> scenario_classifier -> food_search.
- food_search needs all of its inputs mapped:
  - "keywords": "step_2.scenario" (never the raw query)
  - "city": "step_1.city"
  - "location": "step_1.location" (a "lng,lat" string)
  - "types": "step_2.types"

## Example
Request: "我在北京想吃川菜"
{
    "steps": [
        {"step_id": 1, "task_name": "parse_query", "description": "resolve the city and coordinates in the request", "input_mapping": null},
        {"step_id": 2, "task_name": "scenario_classifier", "description": "classify the dining scenario and map it to an AMap type", "input_mapping": null},
        {"step_id": 3, "task_name": "food_search", "description": "search restaurants near the resolved location", "input_mapping": {
            "keywords": "step_2.scenario",
            "city": "step_1.city",
            "location": "step_1.location",
            "types": "step_2.types"
        }}
    ]
}"#;

pub const PLANNER_USER_PROMPT_TEMPLATE: &str = r#"Food recommendation request: {query}

Previously failed plans (if any):
{past_plans}

Replan count: {replan_count}

Produce a detailed execution plan for this request. Work out what the user needs (location, cuisine, budget, rating) and design a sensible sequence of steps. If this is a replan, do not repeat a failed approach.

Return the JSON plan only, with no other text."#;

pub const PLANNER_REPLAN_PROMPT_TEMPLATE: &str = r#"Original food recommendation request: {query}

The previous plan failed with this error:
{error_info}

Plans already tried:
{past_plans}

Replan count: {replan_count}

Produce an improved plan that avoids this failure. Consider:
1. What is the root cause (location resolution, search service, data flow between steps)?
2. Would a different step order or a different task unit avoid it?
3. Are extra validation or intermediate steps needed?
4. Should the search inputs be adjusted?

Return the JSON plan only, with no other text."#;

pub const CATALOG_HEADER: &str = "Available task units:";

pub const STRICT_NAME_INSTRUCTION: &str = "Important: only the task units listed above may be used, and `task_name` must match a listed key exactly. Do not invent or rename task units.";

/// Substitutes `{key}` placeholders in `template` in a single pass.
///
/// Substituted values are never re-scanned, so a query containing `{...}` is
/// inserted literally. Unknown placeholders are left as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        if let Some(end) = after.find('}') {
            if let Some((_, value)) = vars.iter().find(|(key, _)| *key == &after[..end]) {
                out.push_str(value);
                rest = &after[end + 1..];
                continue;
            }
        }
        out.push('{');
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_every_occurrence() {
        let out = render("{a}-{b}-{a}", &[("a", "1"), ("b", "2")]);
        assert_eq!(out, "1-2-1");
    }

    #[test]
    fn render_does_not_rescan_values_or_touch_unknown_keys() {
        let out = render("{query} {other}", &[("query", "{replan_count}"), ("replan_count", "9")]);
        assert_eq!(out, "{replan_count} {other}");
    }

    #[test]
    fn templates_only_use_known_placeholders() {
        let filled = render(
            PLANNER_REPLAN_PROMPT_TEMPLATE,
            &[
                ("query", "q"),
                ("error_info", "e"),
                ("past_plans", "p"),
                ("replan_count", "1"),
            ],
        );
        assert!(!filled.contains('{'));
        let filled = render(
            PLANNER_USER_PROMPT_TEMPLATE,
            &[("query", "q"), ("past_plans", "p"), ("replan_count", "0")],
        );
        assert!(!filled.contains('{'));
    }
}
