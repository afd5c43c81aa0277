//! Daily study streak advancement
//!
//! A streak is a count of consecutive calendar days with at least one
//! check-in or recorded study session. All arithmetic happens on calendar
//! dates (UTC), so time-of-day and DST cannot skew the day difference.

use chrono::NaiveDate;

/// Stored streak state, as loaded from the streaks table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: i64,
    pub last_study_date: NaiveDate,
}

/// Result of advancing a streak for a check-in on `today`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakAdvance {
    /// No streak row existed; a new streak starts at 1
    Started,
    /// Last study date is today; nothing to update
    AlreadyCheckedIn,
    /// Last study date was exactly yesterday; streak grows by one
    Incremented { new_streak: i64 },
    /// Gap of more than one day (or a clock moved backwards); reset to 1
    Reset,
}

impl StreakAdvance {
    /// The streak value to persist, or None when no write is needed
    pub fn new_streak(&self) -> Option<i64> {
        match self {
            StreakAdvance::Started | StreakAdvance::Reset => Some(1),
            StreakAdvance::Incremented { new_streak } => Some(*new_streak),
            StreakAdvance::AlreadyCheckedIn => None,
        }
    }

    /// Human-readable outcome used in API responses
    pub fn message(&self) -> &'static str {
        match self {
            StreakAdvance::Started => "Streak started",
            StreakAdvance::AlreadyCheckedIn => "Already checked in today",
            StreakAdvance::Incremented { .. } => "Streak incremented",
            StreakAdvance::Reset => "Streak reset",
        }
    }
}

/// Advance a streak for a check-in happening on `today`
pub fn advance(state: Option<StreakState>, today: NaiveDate) -> StreakAdvance {
    let Some(state) = state else {
        return StreakAdvance::Started;
    };

    let gap_days = (today - state.last_study_date).num_days();

    match gap_days {
        0 => StreakAdvance::AlreadyCheckedIn,
        1 => StreakAdvance::Incremented {
            new_streak: state.current_streak + 1,
        },
        // Negative gaps mean the stored date is in the future relative to
        // today (clock skew); treat like any other broken chain.
        _ => StreakAdvance::Reset,
    }
}
