use chrono::{DateTime, Utc};
use crate::models::{Meet, MeetStatus};

/// Outcome of evaluating a meet against the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status did not change; nothing to persist
    Unchanged,
    /// The meet just moved from `Active` to `Finished`
    Finished,
}

impl Meet {
    /// Lazily apply expiry
    ///
    /// A meet whose expiry has been reached becomes `Finished`. `Finished`
    /// never goes back, whatever the clock says.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Transition {
        match self.status {
            MeetStatus::Finished => Transition::Unchanged,
            MeetStatus::Active if now >= self.expires_at => {
                self.status = MeetStatus::Finished;
                Transition::Finished
            }
            MeetStatus::Active => Transition::Unchanged,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == MeetStatus::Finished
    }
}
