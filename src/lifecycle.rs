//! Shared three-state lifecycle engine.
//!
//! Source and sink run the same fixed transition table:
//!
//! ```text
//! Connecting --Success--> Processing   Connecting --Error--> Connecting
//! Processing --Success--> Processing   Processing --Error--> Closing
//! Closing    --Success--> Connecting   Closing    --Error--> Connecting
//! ```
//!
//! Each role supplies its own per-state processing functions; the shared
//! part is the state set, the transition function and the [`Lifecycle`]
//! tracker that logs state entries and non-success transitions. The table
//! is an exhaustive `match`, so the transition function is total: there is
//! no missing-entry condition to handle at runtime.

use std::time::Duration;

/// Lifecycle states shared by source and sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Acquiring a fresh database connection.
    Connecting,
    /// Running sessions against the held connection.
    Processing,
    /// Releasing the held connection.
    Closing,
}

/// Result category of one state-processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step completed normally.
    Success,
    /// The step failed; the table decides where to go next.
    Error,
}

/// Outcome of one state-processing step plus the delay to observe before
/// the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// Outcome driving the next transition.
    pub outcome: Outcome,
    /// Delay before the next step.
    pub delay: Duration,
}

impl ProcessResult {
    /// A successful step with the given delay.
    #[must_use]
    pub const fn success(delay: Duration) -> Self {
        Self {
            outcome: Outcome::Success,
            delay,
        }
    }

    /// A failed step with the given delay.
    #[must_use]
    pub const fn error(delay: Duration) -> Self {
        Self {
            outcome: Outcome::Error,
            delay,
        }
    }
}

/// Successor state for `(state, outcome)` per the fixed transition table.
#[must_use]
pub const fn next_state(state: State, outcome: Outcome) -> State {
    match (state, outcome) {
        (State::Connecting, Outcome::Success) => State::Processing,
        (State::Connecting, Outcome::Error) => State::Connecting,
        (State::Processing, Outcome::Success) => State::Processing,
        (State::Processing, Outcome::Error) => State::Closing,
        (State::Closing, _) => State::Connecting,
    }
}

/// Tracks the current state of one role's machine and logs transitions.
#[derive(Debug)]
pub struct Lifecycle {
    current: State,
    last: Option<State>,
}

impl Lifecycle {
    /// A fresh machine starting in [`State::Connecting`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: State::Connecting,
            last: None,
        }
    }

    /// The state to process next.
    #[must_use]
    pub fn current(&self) -> State {
        self.current
    }

    /// Marks the start of a processing step, logging the state if it
    /// changed since the previous step.
    pub fn begin_step(&mut self) {
        if self.last != Some(self.current) {
            tracing::info!(state = ?self.current, "entering state");
        }
    }

    /// Advances to the successor state for `outcome`.
    pub fn advance(&mut self, outcome: Outcome) {
        self.last = Some(self.current);
        self.current = next_state(self.current, outcome);
        if outcome != Outcome::Success {
            tracing::info!(from = ?self.last, to = ?self.current, "state transition after error");
        }
    }

    /// Forces the machine into [`State::Closing`], used on shutdown to
    /// release resources deterministically regardless of current state.
    pub fn force_closing(&mut self) {
        self.current = State::Closing;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_the_design() {
        assert_eq!(
            next_state(State::Connecting, Outcome::Success),
            State::Processing
        );
        assert_eq!(
            next_state(State::Connecting, Outcome::Error),
            State::Connecting
        );
        assert_eq!(
            next_state(State::Processing, Outcome::Success),
            State::Processing
        );
        assert_eq!(next_state(State::Processing, Outcome::Error), State::Closing);
        assert_eq!(next_state(State::Closing, Outcome::Success), State::Connecting);
        assert_eq!(next_state(State::Closing, Outcome::Error), State::Connecting);
    }

    #[test]
    fn connection_failures_stay_in_connecting() {
        let mut lifecycle = Lifecycle::new();
        for _ in 0..3 {
            lifecycle.advance(Outcome::Error);
            assert_eq!(lifecycle.current(), State::Connecting);
        }
    }

    #[test]
    fn processing_failure_cycles_through_closing() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Outcome::Success);
        assert_eq!(lifecycle.current(), State::Processing);

        lifecycle.advance(Outcome::Error);
        assert_eq!(lifecycle.current(), State::Closing);

        lifecycle.advance(Outcome::Success);
        assert_eq!(lifecycle.current(), State::Connecting);
    }

    #[test]
    fn steady_state_stays_in_processing() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Outcome::Success);
        for _ in 0..5 {
            lifecycle.advance(Outcome::Success);
            assert_eq!(lifecycle.current(), State::Processing);
        }
    }

    #[test]
    fn force_closing_overrides_any_state() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Outcome::Success);
        lifecycle.force_closing();
        assert_eq!(lifecycle.current(), State::Closing);
        lifecycle.advance(Outcome::Success);
        assert_eq!(lifecycle.current(), State::Connecting);
    }
}
