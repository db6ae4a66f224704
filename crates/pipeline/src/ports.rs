//! Port traits implemented by infrastructure crates.
//!
//! The engine reaches the outside world through exactly two seams: the oracle
//! that writes plans ([`LlmProvider`]) and the task units that execute steps
//! ([`Capability`]). Both are async and object-safe so the composition root can
//! hand out `Arc<dyn ...>` values.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CapabilityError, CapabilityName, LlmError, StepInput};

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub user: String,
    /// Sampling temperature; planning uses `0.0`.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Builds a deterministic (temperature 0) request.
    pub fn deterministic(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
        }
    }
}

/// The reasoning oracle: turns a prompt into free-form text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Runs one completion and returns the assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl LlmProvider for Arc<dyn LlmProvider> {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// A task unit that executes one kind of plan step.
///
/// Implementations return a JSON object of domain fields plus an
/// `error_messages` list of non-fatal warnings. Returning `Err` is fatal for
/// the step and triggers the router's error handling.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The catalog entry this task unit serves.
    fn name(&self) -> CapabilityName;

    /// Executes the step with its bound input.
    async fn invoke(&self, input: StepInput) -> Result<Value, CapabilityError>;
}
