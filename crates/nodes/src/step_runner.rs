//! Step runner: binds inputs for the step under the cursor and dispatches it.

use pipeline::{
    resolve_step_input, CapabilityCatalog, ErrorInfo, OrchestratorState, Plan, StepOutput,
};
use tracing::{info, warn};

/// Executes exactly one plan step per call.
#[derive(Debug, Clone)]
pub struct StepRunner {
    catalog: CapabilityCatalog,
}

impl StepRunner {
    pub fn new(catalog: CapabilityCatalog) -> Self {
        Self { catalog }
    }

    /// Runs the step at `state.cursor`.
    ///
    /// A cursor outside `1..=plan.len()` records an `OUT_OF_RANGE` error and
    /// dispatches nothing. On success the output is stored under the step's
    /// id and any previous error is cleared; on failure the error is recorded
    /// and no output is stored.
    pub async fn run(&self, mut state: OrchestratorState) -> OrchestratorState {
        let cursor = state.cursor;
        let plan_len = state.plan.as_ref().map_or(0, Plan::len);
        let Some(step) = state.plan.as_ref().and_then(|plan| plan.step_at(cursor)).cloned() else {
            info!(
                run_id = %state.run_id,
                cursor,
                plan_len,
                "cursor is past the plan"
            );
            state.error_info = Some(ErrorInfo::out_of_range(cursor, plan_len));
            return state;
        };

        let input = resolve_step_input(&step, &state.step_results, &state.query);
        info!(
            run_id = %state.run_id,
            step_id = %step.step_id,
            task_name = %step.task_name,
            parameters = input.len(),
            "dispatching step"
        );

        let outcome = self
            .catalog
            .dispatch(step.task_name, input)
            .await
            .and_then(StepOutput::from_value);

        match outcome {
            Ok(output) => {
                info!(
                    run_id = %state.run_id,
                    step_id = %step.step_id,
                    task_name = %step.task_name,
                    "step completed"
                );
                state.step_results.insert(step.step_id, output);
                state.error_info = None;
            }
            Err(err) => {
                warn!(
                    run_id = %state.run_id,
                    step_id = %step.step_id,
                    task_name = %step.task_name,
                    error = %err,
                    "step failed"
                );
                state.error_info = Some(ErrorInfo::from_capability_error(
                    &err,
                    step.step_id.as_u64(),
                    step.task_name,
                ));
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pipeline::{
        parse_plan_response, Capability, CapabilityError, CapabilityName, ErrorType, StepId,
        StepInput,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Fixed(CapabilityName, Result<Value, CapabilityError>);

    #[async_trait]
    impl Capability for Fixed {
        fn name(&self) -> CapabilityName {
            self.0
        }

        async fn invoke(&self, _input: StepInput) -> Result<Value, CapabilityError> {
            self.1.clone()
        }
    }

    fn state_with_plan(catalog: &CapabilityCatalog, cursor: usize) -> OrchestratorState {
        let parsed = parse_plan_response(
            r#"{"steps":[{"step_id":1,"task_name":"parse_query","description":"d"}]}"#,
            catalog,
        )
        .unwrap();
        let mut state = OrchestratorState::new("我在北京想吃川菜");
        state.install_plan(parsed);
        state.cursor = cursor;
        state
    }

    #[tokio::test]
    async fn success_stores_output_and_clears_error() {
        let catalog = CapabilityCatalog::new().with(Arc::new(Fixed(
            CapabilityName::ParseQuery,
            Ok(json!({"city": "北京", "location": "116.4,39.9"})),
        )));
        let mut state = state_with_plan(&catalog, 1);
        state.error_info = Some(ErrorInfo::out_of_range(9, 1));

        let state = StepRunner::new(catalog).run(state).await;

        assert!(state.error_info.is_none());
        let output = &state.step_results[&StepId::new(1).unwrap()];
        assert_eq!(output.get("city"), Some(&json!("北京")));
    }

    #[tokio::test]
    async fn failure_records_execution_error_without_storing() {
        let catalog = CapabilityCatalog::new().with(Arc::new(Fixed(
            CapabilityName::ParseQuery,
            Err(CapabilityError::failed("geocoder unavailable")),
        )));
        let state = state_with_plan(&catalog, 1);

        let state = StepRunner::new(catalog).run(state).await;

        let info = state.error_info.unwrap();
        assert_eq!(info.error_type, ErrorType::ExecutionError);
        assert_eq!(info.step, 1);
        assert_eq!(info.task_name, Some(CapabilityName::ParseQuery));
        assert_eq!(info.message, "geocoder unavailable");
        assert!(state.step_results.is_empty());
    }

    #[tokio::test]
    async fn non_object_output_is_a_parse_error() {
        let catalog = CapabilityCatalog::new().with(Arc::new(Fixed(
            CapabilityName::ParseQuery,
            Ok(json!(["not", "an", "object"])),
        )));
        let state = state_with_plan(&catalog, 1);

        let state = StepRunner::new(catalog).run(state).await;

        assert_eq!(state.error_info.unwrap().error_type, ErrorType::ParseError);
        assert!(state.step_results.is_empty());
    }

    #[tokio::test]
    async fn cursor_past_the_plan_is_out_of_range() {
        let catalog = CapabilityCatalog::new().with(Arc::new(Fixed(
            CapabilityName::ParseQuery,
            Ok(json!({})),
        )));
        let state = state_with_plan(&catalog, 2);

        let state = StepRunner::new(catalog).run(state).await;

        let info = state.error_info.unwrap();
        assert_eq!(info.error_type, ErrorType::OutOfRange);
        assert_eq!(info.step, 2);
        assert!(state.step_results.is_empty());
    }

    #[tokio::test]
    async fn cursor_zero_is_out_of_range() {
        let catalog = CapabilityCatalog::new().with(Arc::new(Fixed(
            CapabilityName::ParseQuery,
            Ok(json!({})),
        )));
        let state = state_with_plan(&catalog, 0);

        let state = StepRunner::new(catalog).run(state).await;

        assert_eq!(state.error_info.unwrap().error_type, ErrorType::OutOfRange);
    }
}
