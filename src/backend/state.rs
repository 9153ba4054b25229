use serde::Serialize;
use std::fmt;

/// Lifecycle of a [`super::ScoringBackend`].
///
/// Transitions only move forward, except `ReadyCompiled → ReadyFallback` on a compiled
/// failure. `ReadyFallback` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    Uninitialized,
    Warming,
    ReadyCompiled,
    ReadyFallback,
}

impl BackendState {
    fn rank(&self) -> u8 {
        match self {
            BackendState::Uninitialized => 0,
            BackendState::Warming => 1,
            BackendState::ReadyCompiled => 2,
            BackendState::ReadyFallback => 3,
        }
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: BackendState) -> bool {
        next.rank() > self.rank()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            BackendState::ReadyCompiled | BackendState::ReadyFallback
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Uninitialized => "uninitialized",
            BackendState::Warming => "warming",
            BackendState::ReadyCompiled => "ready_compiled",
            BackendState::ReadyFallback => "ready_fallback",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
