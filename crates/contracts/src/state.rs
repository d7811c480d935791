//! Three-state capture decision.

use serde::{Deserialize, Serialize};

/// Decision returned by every capture policy operation.
///
/// These are the nominal control signal of the capture protocol, not
/// errors; error conditions are carried by [`CaptureError`](crate::CaptureError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// The policy contributed what it owes for this range.
    Primed,
    /// More data is needed; call again later.
    Retry,
    /// This range is infeasible for the policy; advance past it.
    Abort,
}

impl State {
    /// `true` for [`State::Primed`].
    pub fn is_primed(self) -> bool {
        matches!(self, State::Primed)
    }

    /// Lowercase label used for metrics/log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            State::Primed => "primed",
            State::Retry => "retry",
            State::Abort => "abort",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
