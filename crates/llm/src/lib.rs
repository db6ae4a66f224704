//! Oracle infrastructure adapter.
//!
//! Implements the [`pipeline::LlmProvider`] trait for any OpenAI-compatible
//! chat-completions endpoint (DashScope's compatible mode by default).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing
//! and status-code classification live here. The [`pipeline`] crate sees only
//! [`pipeline::LlmProvider`].

mod openai_compatible;

pub use openai_compatible::{LlmConfig, OpenAiCompatibleProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
