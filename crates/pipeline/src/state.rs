//! The per-run orchestration context.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    route, ErrorInfo, ParsedPlan, Plan, RunId, StepId, StepOutput, Timestamp, Transition,
};

/// Everything one orchestration run knows.
///
/// Created once per request and owned by that run alone. Stages take it by
/// value and hand it back, so no two stages ever hold it at the same time.
#[derive(Debug, Clone)]
pub struct OrchestratorState {
    /// Correlation id for logs and spans.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: Timestamp,
    /// The user's request.
    pub query: String,
    /// The current plan; `None` until the first planning cycle completes.
    pub plan: Option<Plan>,
    /// Raw oracle JSON of every plan produced by a replan, oldest first.
    /// Append-only.
    pub past_plans: Vec<Value>,
    /// 0 after planning; incremented before each dispatch; 1-indexed into the plan.
    pub cursor: usize,
    /// Results of the current plan's completed steps.
    pub step_results: BTreeMap<StepId, StepOutput>,
    /// The most recent step failure, if the last step failed.
    pub error_info: Option<ErrorInfo>,
    /// Replans performed so far. Never decreases.
    pub replan_count: u32,
    /// Serialised final payload; written only by the formatter.
    pub final_result: Option<String>,
}

impl OrchestratorState {
    /// Fresh state for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new_random(),
            started_at: Timestamp::now(),
            query: query.into(),
            plan: None,
            past_plans: Vec::new(),
            cursor: 0,
            step_results: BTreeMap::new(),
            error_info: None,
            replan_count: 0,
            final_result: None,
        }
    }

    /// Returns `true` once at least one replan has been triggered.
    pub fn is_replan(&self) -> bool {
        self.replan_count > 0
    }

    /// Installs a freshly parsed plan: resets the cursor, discards the old
    /// plan's results and error and, on a replan, records the oracle's JSON in
    /// history.
    pub fn install_plan(&mut self, parsed: ParsedPlan) {
        self.supersede_plan(Some(parsed.raw));
        self.plan = Some(parsed.plan);
        self.error_info = None;
    }

    /// Records a plan the oracle produced but that cannot run.
    ///
    /// The old plan is discarded as for [`Self::install_plan`]; no plan is
    /// installed in its place and `error_info` holds the violation, so the
    /// router decides between a replan and the error terminal.
    pub fn reject_plan(&mut self, raw: Option<Value>, error_info: ErrorInfo) {
        self.supersede_plan(raw);
        self.plan = None;
        self.error_info = Some(error_info);
    }

    fn supersede_plan(&mut self, raw: Option<Value>) {
        if let Some(raw) = raw.filter(|_| self.is_replan()) {
            self.past_plans.push(raw);
        }
        self.cursor = 0;
        self.step_results.clear();
    }

    /// Plan history rendered one compact JSON object per line.
    pub fn past_plans_text(&self) -> String {
        self.past_plans
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Asks the router for the next transition.
    pub fn next_transition(&self) -> Transition {
        route(
            self.plan.as_ref().map(Plan::len),
            self.cursor,
            self.error_info.as_ref(),
            self.replan_count,
        )
    }
}
