//! Error types for the orchestration domain.
//!
//! [`OrchestrationError`] is the only error that escapes an orchestration run.
//! Step-level failures never surface as Rust errors past the step runner: they
//! are folded into a structured [`crate::ErrorInfo`] and handed to the router.
//!
//! [`CapabilityError`] is the single result error of every capability
//! invocation and of catalog dispatch; [`CapabilityError::error_type`] decides
//! how the router will classify it.

use thiserror::Error;

use crate::{CapabilityName, ErrorType};

// ---------------------------------------------------------------------------
// Planning errors
// ---------------------------------------------------------------------------

/// The oracle's planning output could not be turned into a valid [`crate::Plan`].
///
/// Output that is not a usable plan at all (bad JSON, wrong shape, no steps,
/// broken numbering) terminates the run with [`OrchestrationError::PlanParse`].
/// A well-formed plan that names an unregistered capability or binds a bad
/// reference is a step violation instead; see
/// [`PlanParseError::violating_step`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanParseError {
    /// The response text is not valid JSON after fence stripping.
    #[error("oracle response is not valid JSON: {message}")]
    InvalidJson {
        /// Parser diagnostic.
        message: String,
    },

    /// The response is JSON but not a `{"steps": [...]}` object of plan steps.
    #[error("oracle response does not match the plan shape: {message}")]
    InvalidShape {
        /// Deserialiser diagnostic.
        message: String,
    },

    /// The plan has no steps.
    #[error("plan contains no steps")]
    EmptyPlan,

    /// Step ids are not `1, 2, 3, ...` in list order.
    #[error("step ids must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguousStepIds {
        /// The id the step at this position should carry.
        expected: u64,
        /// The id it actually carries.
        found: u64,
    },

    /// A step names a task unit that is not in the capability catalog.
    #[error("step {step} names unknown capability '{name}'")]
    UnknownCapability {
        /// Offending step.
        step: u64,
        /// The name as written by the oracle.
        name: String,
    },

    /// An input mapping value looks like a step reference but is not
    /// `step_<N>.<field>`.
    #[error("step {step} parameter '{parameter}' has malformed reference '{reference}'")]
    MalformedReference {
        /// Offending step.
        step: u64,
        /// Parameter the reference was bound to.
        parameter: String,
        /// The reference text.
        reference: String,
    },

    /// An input mapping references a step that does not run before this one.
    #[error("step {step} parameter '{parameter}' references step {referenced}, which does not run before it")]
    ForwardReference {
        /// Offending step.
        step: u64,
        /// Parameter the reference was bound to.
        parameter: String,
        /// The referenced step id.
        referenced: u64,
    },
}

impl PlanParseError {
    /// The step at fault when the plan was well-formed but one of its steps
    /// could not run as written.
    ///
    /// These violations are recorded as an `EXECUTION_ERROR` for that step and
    /// handed to the router, so a new plan can be requested.
    pub fn violating_step(&self) -> Option<u64> {
        match self {
            Self::UnknownCapability { step, .. }
            | Self::MalformedReference { step, .. }
            | Self::ForwardReference { step, .. } => Some(*step),
            Self::InvalidJson { .. }
            | Self::InvalidShape { .. }
            | Self::EmptyPlan
            | Self::NonContiguousStepIds { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

/// Errors from an [`crate::LlmProvider`] call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The provider throttled the request.
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited {
        /// Seconds from the `Retry-After` header, when present.
        retry_after: Option<u64>,
    },

    /// The provider answered 2xx but the body was not a usable completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// No API key is configured for the provider.
    #[error("missing API key: {0}")]
    MissingApiKey(String),
}

// ---------------------------------------------------------------------------
// Capability errors
// ---------------------------------------------------------------------------

/// Failure of a capability invocation or of catalog dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    /// The task unit could not complete its work.
    #[error("{message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
    },

    /// The catalog has no registration for the requested capability.
    #[error("capability '{name}' is not registered")]
    UnknownCapability {
        /// The requested capability.
        name: CapabilityName,
    },

    /// The task unit produced something other than a keyed JSON object.
    #[error("capability returned malformed output: {message}")]
    MalformedOutput {
        /// What was wrong with the output.
        message: String,
    },
}

impl CapabilityError {
    /// Shorthand for [`CapabilityError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Classification recorded in `error_info` when this error reaches the
    /// step runner.
    ///
    /// Unknown capabilities are folded into [`ErrorType::ExecutionError`] and
    /// lose their identity; malformed output is a contract breach that
    /// replanning cannot repair.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Failed { .. } | Self::UnknownCapability { .. } => ErrorType::ExecutionError,
            Self::MalformedOutput { .. } => ErrorType::ParseError,
        }
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that abort an orchestration run.
///
/// A run that ends in the router's `Error` transition is *not* an
/// `OrchestrationError`; it is a normal, fail-closed outcome.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The planner could not parse or validate the oracle's plan.
    #[error("plan parse error: {0}")]
    PlanParse(#[from] PlanParseError),

    /// The oracle call itself failed.
    #[error("oracle call failed: {0}")]
    Oracle(#[from] LlmError),

    /// The final payload could not be serialised.
    #[error("final result could not be serialised: {message}")]
    Serialization {
        /// Serialiser diagnostic.
        message: String,
    },
}
