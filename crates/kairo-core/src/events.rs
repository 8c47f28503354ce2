use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::SessionFamily;
use crate::timer::RunState;

/// Every state change in the engine produces an Event.
/// The view layer polls for events; cue collaborators react to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        mode_id: u32,
        family: SessionFamily,
        duration_secs: u64,
        session_ordinal: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown rewound to the full duration, still on the session screen.
    SessionReset {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    SessionExited {
        family: SessionFamily,
        at: DateTime<Utc>,
    },
    /// Break abandoned early. Not a completion: no history entry.
    BreakSkipped {
        at: DateTime<Utc>,
    },
    FamilySwitched {
        family: SessionFamily,
        mode_id: u32,
        running: bool,
        at: DateTime<Utc>,
    },
    /// Natural countdown completion. Fired exactly once per session.
    SessionCompleted {
        mode_id: u32,
        family: SessionFamily,
        duration_minutes: f64,
        next_family: SessionFamily,
        auto_continued: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        run_state: RunState,
        family: SessionFamily,
        mode_id: u32,
        mode_label: String,
        remaining_secs: u64,
        total_secs: u64,
        session_ordinal: u32,
        at: DateTime<Utc>,
    },
}
