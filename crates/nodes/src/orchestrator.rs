//! The plan-execute loop.
//!
//! ```text
//! Planner ──► advance_cursor ──► StepRunner ──► route
//!    ▲              ▲                             │
//!    │              └────────── Continue ─────────┤
//!    └───────────────────────── Replan ───────────┤
//!                          End ──► format_result ─┤
//!                          Error ──► RunOutcome::Failed
//! ```
//!
//! Stages run strictly one after another; each receives the state by value
//! and hands it back. A plan the planner rejected skips straight to `route`.

use std::sync::Arc;

use pipeline::{
    CapabilityCatalog, ErrorInfo, ErrorType, LlmProvider, OrchestrationError, OrchestratorState,
    RecommendationPayload, Transition,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{advance_cursor, format_result, PlannerNode, StepRunner};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step ran and the result was formatted.
    Completed {
        payload: RecommendationPayload,
        state: Box<OrchestratorState>,
    },
    /// The router reached its error terminal. No result was formatted.
    Failed {
        error_info: ErrorInfo,
        replan_count: u32,
        state: Box<OrchestratorState>,
    },
}

impl RunOutcome {
    /// The final state of the run, whichever way it ended.
    pub fn state(&self) -> &OrchestratorState {
        match self {
            Self::Completed { state, .. } | Self::Failed { state, .. } => state,
        }
    }
}

/// Drives one orchestration run per call. Holds no per-run state, so a single
/// instance can serve concurrent requests.
pub struct Orchestrator {
    planner: PlannerNode,
    runner: StepRunner,
}

impl Orchestrator {
    pub fn new(oracle: Arc<dyn LlmProvider>, catalog: CapabilityCatalog) -> Self {
        Self {
            planner: PlannerNode::new(oracle, catalog.clone()),
            runner: StepRunner::new(catalog),
        }
    }

    /// Runs a fresh orchestration for `query`.
    pub async fn run(&self, query: &str) -> Result<RunOutcome, OrchestrationError> {
        let state = OrchestratorState::new(query);
        let span = info_span!("orchestration_run", run_id = %state.run_id);
        self.drive(state).instrument(span).await
    }

    async fn drive(&self, state: OrchestratorState) -> Result<RunOutcome, OrchestrationError> {
        info!(query = %state.query, "orchestration started");
        let mut state = self.planner.run(state).await?;

        loop {
            // A rejected plan goes straight to the router.
            if state.plan.is_some() {
                state = advance_cursor(state);
                state = self.runner.run(state).await;
            }

            match state.next_transition() {
                Transition::Continue => {}
                Transition::Replan => {
                    state.replan_count += 1;
                    warn!(
                        replan_count = state.replan_count,
                        error_type = state.error_info.as_ref().map(|e| e.error_type.as_str()),
                        "step failed; replanning"
                    );
                    state = self.planner.run(state).await?;
                }
                Transition::End => {
                    let (state, payload) = format_result(state)?;
                    info!(
                        replan_count = state.replan_count,
                        elapsed_ms = state.started_at.elapsed_ms(),
                        "orchestration completed"
                    );
                    return Ok(RunOutcome::Completed {
                        payload,
                        state: Box::new(state),
                    });
                }
                Transition::Error => {
                    let error_info = state.error_info.clone().unwrap_or_else(|| ErrorInfo {
                        error_type: ErrorType::ExecutionError,
                        message: "run ended without a recorded error".to_owned(),
                        step: state.cursor as u64,
                        task_name: None,
                    });
                    error!(
                        replan_count = state.replan_count,
                        error_type = error_info.error_type.as_str(),
                        step = error_info.step,
                        message = %error_info.message,
                        "orchestration failed"
                    );
                    return Ok(RunOutcome::Failed {
                        error_info,
                        replan_count: state.replan_count,
                        state: Box::new(state),
                    });
                }
            }
        }
    }
}
