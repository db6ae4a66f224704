//! The post-step routing decision.
//!
//! [`route`] is a pure function of four values. Evaluation order matters and
//! is fixed:
//!
//! 1. a plan exists and the cursor is past its end → [`Transition::End`];
//! 2. an error is recorded:
//!    - replan budget exhausted → [`Transition::Error`],
//!    - unrecoverable error type → [`Transition::Error`],
//!    - otherwise → [`Transition::Replan`];
//! 3. otherwise → [`Transition::Continue`].
//!
//! Rule 1 wins over rule 2 unconditionally, so a completed plan is formatted
//! even though the step runner's out-of-range guard has recorded an error on
//! the way there.

use serde::Serialize;

use crate::ErrorInfo;

/// Number of replans allowed in one run before a recoverable error becomes fatal.
pub const MAX_REPLAN_COUNT: u32 = 3;

/// Next stage chosen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Advance the cursor and run the next step.
    Continue,
    /// Discard the plan and ask the oracle for a new one.
    Replan,
    /// All steps ran; format the result. Terminal.
    End,
    /// Unrecoverable failure; no result is produced. Terminal.
    Error,
}

impl Transition {
    /// Returns `true` for [`Transition::End`] and [`Transition::Error`].
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Error)
    }
}

/// Chooses the next transition.
///
/// The caller is responsible for incrementing the replan counter when this
/// returns [`Transition::Replan`].
pub fn route(
    plan_len: Option<usize>,
    cursor: usize,
    error_info: Option<&ErrorInfo>,
    replan_count: u32,
) -> Transition {
    if plan_len.is_some_and(|len| cursor > len) {
        return Transition::End;
    }

    match error_info {
        Some(_) if replan_count >= MAX_REPLAN_COUNT => Transition::Error,
        Some(info) if !info.error_type.is_recoverable() => Transition::Error,
        Some(_) => Transition::Replan,
        None => Transition::Continue,
    }
}
