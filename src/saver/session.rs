use log::trace;
use std::fmt;

/// Where a save-with-retries operation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Loading,
    Saving,
    Retrying,
    Succeeded,
    Failed,
}

impl SaveState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Saving => "saving",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Attempt accumulator for one logical save-with-retries operation.
///
/// A session is created per top-level save and dropped when it terminates,
/// so the attempt counter never leaks between operations.
#[derive(Debug, Clone)]
pub struct RetrySession {
    max_retries: u32,
    attempt: u32,
    state: SaveState,
}

impl RetrySession {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempt: 0,
            state: SaveState::Idle,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Number of attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Retries still permitted as of the current attempt.
    ///
    /// Equals `max_retries - (attempt - 1)`; zero or less means the next
    /// conflict is final.
    pub fn retries_remaining(&self) -> i64 {
        i64::from(self.max_retries) - (i64::from(self.attempt) - 1)
    }

    /// Starts a new attempt: bumps the counter and enters `Loading`.
    pub fn begin_attempt(&mut self) {
        debug_assert!(
            matches!(self.state, SaveState::Idle | SaveState::Retrying),
            "attempt started from {}",
            self.state
        );
        self.attempt += 1;
        self.transition(SaveState::Loading);
    }

    pub fn loaded(&mut self) {
        self.transition(SaveState::Saving);
    }

    pub fn succeeded(&mut self) {
        self.transition(SaveState::Succeeded);
    }

    pub fn failed(&mut self) {
        self.transition(SaveState::Failed);
    }

    /// Records a version conflict on the current attempt.
    ///
    /// Returns `true` and enters `Retrying` while budget remains, otherwise
    /// enters `Failed` and returns `false`.
    pub fn conflicted(&mut self) -> bool {
        if self.retries_remaining() <= 0 {
            self.transition(SaveState::Failed);
            return false;
        }
        self.transition(SaveState::Retrying);
        true
    }

    fn transition(&mut self, next: SaveState) {
        debug_assert!(!self.state.is_terminal(), "session already {}", self.state);
        trace!("save attempt {}: {} -> {}", self.attempt, self.state, next);
        self.state = next;
    }
}
