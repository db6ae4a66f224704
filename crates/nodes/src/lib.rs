//! Orchestration stages for the restaurant recommendation agent.
//!
//! This crate sequences the plan-execute cycle: the planner asks the oracle
//! for a plan, the executor advances the cursor, the step runner dispatches
//! one capability, the router (in [`pipeline`]) picks the next transition and
//! the formatter produces the final payload.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between business logic in the
//! [`pipeline`] crate and the `LlmProvider` / `Capability` ports. They contain
//! no domain rules of their own.

pub mod executor;
pub mod formatter;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod step_runner;

pub use executor::advance_cursor;
pub use formatter::format_result;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use planner::PlannerNode;
pub use step_runner::StepRunner;

/// Truncates `text` to at most `max_chars` characters for log output.
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...(truncated)")
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_for_log;

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_for_log("北京川菜", 2), "北京...(truncated)");
        assert_eq!(truncate_for_log("北京", 2), "北京");
    }
}
