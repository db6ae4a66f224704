//! Core orchestration domain for the restaurant recommendation agent.
//!
//! This crate contains every domain concept the plan-execute cycle works with:
//! the plan model, the per-run state, the capability catalog, the router, input
//! binding and result formatting. Infrastructure crates implement the traits
//! defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`StepId`, `RunId`, `FieldName`, `ModelName`) |
//! | [`types`] | Shared value types (`StepInput`, `StepOutput`, `ErrorInfo`, `Timestamp`) |
//! | [`errors`] | Planning, oracle, capability and run-level error types |
//! | [`catalog`] | The closed `CapabilityName` set and the `CapabilityCatalog` registry |
//! | [`ports`] | `LlmProvider` and `Capability` traits |
//! | [`plan`] | Plan model, data-flow references, oracle-output parsing |
//! | [`state`] | `OrchestratorState` |
//! | [`routing`] | The pure router and `MAX_REPLAN_COUNT` |
//! | [`binding`] | Step input resolution |
//! | [`formatting`] | Final payload aggregation |

pub mod binding;
pub mod catalog;
pub mod errors;
pub mod formatting;
pub mod identifiers;
pub mod plan;
pub mod ports;
pub mod routing;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use binding::{resolve_step_input, QUERY_PARAM};
pub use catalog::{CapabilityCatalog, CapabilityName};
pub use errors::{CapabilityError, LlmError, OrchestrationError, PlanParseError};
pub use formatting::{aggregate_errors, find_by_shape, RecommendationPayload};
pub use identifiers::{FieldName, ModelName, RunId, StepId};
pub use plan::{
    parse_plan_response, strip_code_fences, InputSource, ParsedPlan, Plan, PlanStep, SourceRef,
};
pub use ports::{Capability, CompletionRequest, LlmProvider};
pub use routing::{route, Transition, MAX_REPLAN_COUNT};
pub use state::OrchestratorState;
pub use types::{ErrorInfo, ErrorType, StepInput, StepOutput, Timestamp};
