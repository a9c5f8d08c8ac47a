//! Session State Machine
//!
//! Owns the learner's mode, current choice and the learning-mode "breather"
//! countdown. Every transition is a plain synchronous method, so a caller
//! that owns the `Session` can never observe one half-applied.
//!
//! The breather is driven from outside: whoever owns the session calls
//! [`Session::tick`] once per elapsed second (see [`crate::breather`]).

use crate::content::{ContentStore, PatientCase};
use crate::error::{LookupError, SessionError};
use crate::grading::{self, Checkpoint, Feedback};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the learning-mode pause after a choice.
pub const BREATHER_SECONDS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Browse,
    Learning,
    Testing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Browse => write!(f, "browse"),
            Mode::Learning => write!(f, "learning"),
            Mode::Testing => write!(f, "testing"),
        }
    }
}

/// What a successful [`Session::choose`] did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// Learning mode: a breather of [`BREATHER_SECONDS`] is now running.
    BreatherStarted,
    Recorded,
}

/// State of one learner session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    mode: Mode,
    selected_choice: Option<String>,
    breather_remaining_seconds: u32,
    /// Bumped whenever the attempt is superseded (mode change or reset).
    generation: u64,
}

impl Session {
    /// A fresh session: browse mode, nothing selected, no breather.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected_choice(&self) -> Option<&str> {
        self.selected_choice.as_deref()
    }

    pub fn breather_remaining_seconds(&self) -> u32 {
        self.breather_remaining_seconds
    }

    /// Identifies the current attempt; work started under an older
    /// generation belongs to a superseded attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_breather_active(&self) -> bool {
        self.mode == Mode::Learning && self.breather_remaining_seconds > 0
    }

    pub fn can_choose(&self) -> bool {
        !self.is_breather_active()
    }

    pub fn can_reset(&self) -> bool {
        !self.is_breather_active()
    }

    /// Switches mode. Always legal; always clears the choice and the timer.
    pub fn set_mode(&mut self, next: Mode) {
        self.mode = next;
        self.clear_attempt();
    }

    /// Records a choice, starting the breather in learning mode.
    ///
    /// Rejected without touching the session while the breather is active.
    pub fn choose(&mut self, drug_id: impl Into<String>) -> Result<ChoiceOutcome, SessionError> {
        if !self.can_choose() {
            return Err(SessionError::ChoiceDuringBreather);
        }
        self.selected_choice = Some(drug_id.into());
        if self.mode == Mode::Learning {
            self.breather_remaining_seconds = BREATHER_SECONDS;
            Ok(ChoiceOutcome::BreatherStarted)
        } else {
            Ok(ChoiceOutcome::Recorded)
        }
    }

    /// Advances the breather by one second and returns the remaining time.
    /// The choice and its feedback stay in place when it reaches zero.
    pub fn tick(&mut self) -> u32 {
        self.breather_remaining_seconds = self.breather_remaining_seconds.saturating_sub(1);
        self.breather_remaining_seconds
    }

    /// Clears the current attempt. Blocked during a learning-mode breather.
    pub fn reset_attempt(&mut self) -> Result<(), SessionError> {
        if !self.can_reset() {
            return Err(SessionError::ResetDuringBreather);
        }
        self.clear_attempt();
        Ok(())
    }

    fn clear_attempt(&mut self) {
        self.selected_choice = None;
        self.breather_remaining_seconds = 0;
        self.generation += 1;
    }

    /// Grades the current selection against `case`.
    pub fn feedback(&self, store: &ContentStore, case: &PatientCase) -> Result<Feedback, LookupError> {
        grading::grade(store, case, self.selected_choice())
    }

    /// Serializable view of the session with its derived feedback.
    pub fn snapshot(
        &self,
        store: &ContentStore,
        case: &PatientCase,
    ) -> Result<SessionSnapshot, LookupError> {
        let learning = self.mode == Mode::Learning;
        let checkpoint = match self.selected_choice() {
            Some(choice) if learning => Some(grading::checkpoint(store, case, choice)?),
            _ => None,
        };
        let breather_status = (learning && self.selected_choice.is_some())
            .then(|| grading::breather_status(self.breather_remaining_seconds));

        Ok(SessionSnapshot {
            mode: self.mode,
            selected_choice: self.selected_choice.clone(),
            breather_remaining_seconds: self.breather_remaining_seconds,
            can_choose: self.can_choose(),
            can_reset: self.can_reset(),
            feedback: self.feedback(store, case)?,
            checkpoint,
            breather_status,
        })
    }
}

/// Everything the UI needs to render the decision panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub selected_choice: Option<String>,
    pub breather_remaining_seconds: u32,
    pub can_choose: bool,
    pub can_reset: bool,
    pub feedback: Feedback,
    pub checkpoint: Option<Checkpoint>,
    pub breather_status: Option<String>,
}
