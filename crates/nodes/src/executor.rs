//! Cursor advancement.

use pipeline::OrchestratorState;
use tracing::debug;

/// Moves the cursor to the next step. Nothing else is touched.
pub fn advance_cursor(mut state: OrchestratorState) -> OrchestratorState {
    state.cursor += 1;
    debug!(run_id = %state.run_id, cursor = state.cursor, "cursor advanced");
    state
}
