//! Formatter stage: the only writer of `final_result`.

use pipeline::{OrchestrationError, OrchestratorState, RecommendationPayload};
use tracing::info;

/// Aggregates the step results into the final payload and stores its JSON
/// text in `state.final_result`.
pub fn format_result(
    mut state: OrchestratorState,
) -> Result<(OrchestratorState, RecommendationPayload), OrchestrationError> {
    let payload = RecommendationPayload::from_step_results(&state.query, &state.step_results);
    let text = serde_json::to_string_pretty(&payload).map_err(|e| {
        OrchestrationError::Serialization {
            message: e.to_string(),
        }
    })?;

    info!(
        run_id = %state.run_id,
        restaurant_count = payload.restaurant_count,
        warning_count = payload.errors.len(),
        elapsed_ms = state.started_at.elapsed_ms(),
        "final result formatted"
    );
    state.final_result = Some(text);
    Ok((state, payload))
}
