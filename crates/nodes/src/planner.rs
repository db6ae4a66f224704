//! Planner stage: asks the oracle for a plan and installs it in the state.

use std::sync::Arc;

use pipeline::{
    parse_plan_response, strip_code_fences, CapabilityCatalog, CompletionRequest, ErrorInfo,
    LlmProvider, OrchestrationError, OrchestratorState,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::prompts::{
    render, CATALOG_HEADER, PLANNER_REPLAN_PROMPT_TEMPLATE, PLANNER_SYSTEM_PROMPT,
    PLANNER_USER_PROMPT_TEMPLATE, STRICT_NAME_INSTRUCTION,
};
use crate::truncate_for_log;

const MAX_PROMPT_LOG_CHARS: usize = 4_000;
const MAX_LLM_OUTPUT_LOG_CHARS: usize = 8_000;

/// Builds plans by calling the oracle once per planning cycle.
pub struct PlannerNode {
    oracle: Arc<dyn LlmProvider>,
    catalog: CapabilityCatalog,
}

impl PlannerNode {
    pub fn new(oracle: Arc<dyn LlmProvider>, catalog: CapabilityCatalog) -> Self {
        Self { oracle, catalog }
    }

    /// Builds the oracle request for the current planning cycle.
    ///
    /// A replan embeds the last error and the plan history; an initial plan
    /// embeds only the history (usually empty).
    pub fn build_request(&self, state: &OrchestratorState) -> CompletionRequest {
        let replan_count = state.replan_count.to_string();
        let past_plans = state.past_plans_text();

        let body = if state.is_replan() {
            let error_info = state
                .error_info
                .as_ref()
                .and_then(|info| serde_json::to_string_pretty(info).ok())
                .unwrap_or_else(|| "{}".to_owned());
            render(
                PLANNER_REPLAN_PROMPT_TEMPLATE,
                &[
                    ("query", &state.query),
                    ("error_info", &error_info),
                    ("past_plans", &past_plans),
                    ("replan_count", &replan_count),
                ],
            )
        } else {
            let past_plans = if past_plans.is_empty() {
                "none"
            } else {
                past_plans.as_str()
            };
            render(
                PLANNER_USER_PROMPT_TEMPLATE,
                &[
                    ("query", &state.query),
                    ("past_plans", past_plans),
                    ("replan_count", &replan_count),
                ],
            )
        };

        let user = format!(
            "{body}\n\n{CATALOG_HEADER}\n{}\n{STRICT_NAME_INSTRUCTION}",
            self.catalog.describe()
        );
        CompletionRequest::deterministic(PLANNER_SYSTEM_PROMPT, user)
    }

    /// Runs one planning cycle.
    ///
    /// Oracle failures and unparseable plans abort the run; there is no retry
    /// of the oracle call itself. A plan whose steps name unregistered
    /// capabilities or bind bad references is rejected into `error_info`
    /// and left for the router.
    pub async fn run(
        &self,
        mut state: OrchestratorState,
    ) -> Result<OrchestratorState, OrchestrationError> {
        let request = self.build_request(&state);
        info!(
            run_id = %state.run_id,
            replan = state.is_replan(),
            replan_count = state.replan_count,
            capability_count = self.catalog.len(),
            "planner request prepared"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                user_prompt = %truncate_for_log(&request.user, MAX_PROMPT_LOG_CHARS),
                "planner prompt"
            );
        }

        let output = self.oracle.complete(request).await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                llm_output = %truncate_for_log(&output, MAX_LLM_OUTPUT_LOG_CHARS),
                "planner raw oracle output"
            );
        }

        let parsed = match parse_plan_response(&output, &self.catalog) {
            Ok(parsed) => parsed,
            Err(err) => {
                let Some(step) = err.violating_step() else {
                    return Err(err.into());
                };
                warn!(
                    run_id = %state.run_id,
                    step,
                    error = %err,
                    "planner produced a step that cannot run"
                );
                let raw = serde_json::from_str::<Value>(strip_code_fences(&output)).ok();
                state.reject_plan(raw, ErrorInfo::from_plan_violation(&err, step));
                return Ok(state);
            }
        };
        for step in parsed.plan.steps() {
            info!(
                run_id = %state.run_id,
                step_id = %step.step_id,
                task_name = %step.task_name,
                description = %step.description,
                "planned step"
            );
        }
        info!(
            run_id = %state.run_id,
            step_count = parsed.plan.len(),
            "planner produced plan"
        );

        state.install_plan(parsed);
        Ok(state)
    }
}
