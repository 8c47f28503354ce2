//! Session clock: anchor-based countdown arithmetic.
//!
//! Remaining time is never derived by decrementing a counter per tick; that
//! drifts whenever tick delivery is throttled. On entering the running state
//! the clock stores an absolute `end_time`, and every wake-up recomputes
//! `remaining = ceil((end_time - now) / 1000)`. Ticks wake the owner, they
//! are not a source of truth.
//!
//! All arithmetic is i64 epoch milliseconds with saturating subtraction, so
//! corrupted anchors clamp to an immediate completion instead of faulting.

use crate::storage::PersistedSession;

/// Result of a clock wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining_secs: u64,
    /// True exactly once, on the wake-up that crossed zero.
    pub just_completed: bool,
}

/// Countdown state for a single mode session.
///
/// Owned by the state machine; created on session start and torn down on
/// exit or family switch. Identified by `mode_id` so wake-ups from a stale
/// tick source can be ignored by the owner.
#[derive(Debug, Clone)]
pub struct SessionClock {
    mode_id: u32,
    total_seconds: u64,
    /// Absolute instant the countdown reaches zero. `Some` iff running.
    end_time_epoch_ms: Option<i64>,
    /// Authoritative while paused; last computed value otherwise.
    remaining_seconds: u64,
    completed: bool,
}

impl SessionClock {
    /// A fresh clock, paused at the full duration.
    pub fn new(mode_id: u32, total_seconds: u64) -> Self {
        Self {
            mode_id,
            total_seconds,
            end_time_epoch_ms: None,
            remaining_seconds: total_seconds,
            completed: false,
        }
    }

    /// Rebuild a clock from a persisted snapshot.
    ///
    /// Paused snapshots restore their remaining time verbatim. Running
    /// snapshots restore the anchor; a missing anchor on a running snapshot
    /// is treated as already elapsed, so the next tick completes.
    pub fn restore(snapshot: &PersistedSession) -> Self {
        let end_time = if snapshot.is_paused {
            None
        } else {
            Some(snapshot.end_time.unwrap_or(i64::MIN))
        };
        Self {
            mode_id: snapshot.mode_id,
            total_seconds: snapshot.total_duration,
            end_time_epoch_ms: end_time,
            remaining_seconds: snapshot.time_left,
            completed: false,
        }
    }

    pub fn mode_id(&self) -> u32 {
        self.mode_id
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn end_time_epoch_ms(&self) -> Option<i64> {
        self.end_time_epoch_ms
    }

    pub fn is_running(&self) -> bool {
        self.end_time_epoch_ms.is_some() && !self.completed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Anchor the countdown: `end_time = now + remaining * 1000`.
    /// No-op while already running or after completion.
    pub fn start(&mut self, now_ms: i64) {
        if self.completed || self.end_time_epoch_ms.is_some() {
            return;
        }
        self.end_time_epoch_ms = Some(now_ms.saturating_add(self.remaining_seconds as i64 * 1000));
    }

    /// Freeze the countdown, discarding the anchor.
    pub fn pause(&mut self, now_ms: i64) {
        if let Some(end) = self.end_time_epoch_ms.take() {
            self.remaining_seconds = ceil_remaining_secs(end, now_ms);
        }
    }

    /// Rewind to the full duration, frozen.
    pub fn rewind(&mut self) {
        self.end_time_epoch_ms = None;
        self.remaining_seconds = self.total_seconds;
        self.completed = false;
    }

    /// Recompute remaining time from the anchor. Signals completion exactly
    /// once; wake-ups after that (or while paused) are no-ops.
    pub fn tick(&mut self, now_ms: i64) -> Tick {
        if self.completed {
            return Tick { remaining_secs: 0, just_completed: false };
        }
        let Some(end) = self.end_time_epoch_ms else {
            return Tick { remaining_secs: self.remaining_seconds, just_completed: false };
        };
        let remaining = ceil_remaining_secs(end, now_ms);
        self.remaining_seconds = remaining;
        if remaining == 0 {
            self.completed = true;
            self.end_time_epoch_ms = None;
            return Tick { remaining_secs: 0, just_completed: true };
        }
        Tick { remaining_secs: remaining, just_completed: false }
    }

    /// Current remaining time without mutating completion state.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        if self.completed {
            return 0;
        }
        match self.end_time_epoch_ms {
            Some(end) => ceil_remaining_secs(end, now_ms),
            None => self.remaining_seconds,
        }
    }
}

/// `ceil((end - now) / 1000)`, clamped at zero.
fn ceil_remaining_secs(end_ms: i64, now_ms: i64) -> u64 {
    let delta = end_ms.saturating_sub(now_ms);
    if delta <= 0 {
        0
    } else {
        (delta as u64 + 999) / 1000
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SessionFamily;
    use proptest::prelude::*;

    const T0: i64 = 1_700_000_000_000;

    fn snapshot(remaining: u64, paused: bool, now: i64) -> PersistedSession {
        PersistedSession {
            mode_id: 3,
            family: SessionFamily::Focus,
            end_time: if paused { None } else { Some(now + remaining as i64 * 1000) },
            time_left: remaining,
            total_duration: 1500,
            is_paused: paused,
            last_updated: now,
            session_count: 1,
        }
    }

    #[test]
    fn anchored_remaining_uses_ceiling() {
        let mut clock = SessionClock::new(3, 10);
        clock.start(T0);
        assert_eq!(clock.remaining_at(T0), 10);
        assert_eq!(clock.remaining_at(T0 + 1), 10);
        assert_eq!(clock.remaining_at(T0 + 9_999), 1);
        assert_eq!(clock.remaining_at(T0 + 10_000), 0);
    }

    #[test]
    fn one_second_mode_completes_and_never_goes_negative() {
        let mut clock = SessionClock::new(1, 1);
        clock.start(T0);
        let tick = clock.tick(T0 + 1_500);
        assert!(tick.just_completed);
        assert_eq!(tick.remaining_secs, 0);
        assert_eq!(clock.remaining_at(T0 + 999_999), 0);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut clock = SessionClock::new(1, 1);
        clock.start(T0);
        assert!(clock.tick(T0 + 2_000).just_completed);
        assert!(!clock.tick(T0 + 3_000).just_completed);
        assert!(!clock.tick(T0 + 4_000).just_completed);
        assert!(clock.is_completed());
    }

    #[test]
    fn pause_freezes_remaining_time() {
        let mut clock = SessionClock::new(3, 1500);
        clock.start(T0);
        clock.pause(T0 + 100_000);
        assert_eq!(clock.remaining_at(T0 + 100_000), 1400);
        // Frozen: wall-clock advance no longer matters.
        assert_eq!(clock.remaining_at(T0 + 900_000), 1400);
        assert!(!clock.is_running());
    }

    #[test]
    fn resume_reanchors_from_frozen_value() {
        let mut clock = SessionClock::new(3, 1500);
        clock.start(T0);
        clock.pause(T0 + 100_000);
        clock.start(T0 + 500_000);
        assert_eq!(clock.remaining_at(T0 + 500_000), 1400);
        assert_eq!(clock.remaining_at(T0 + 501_000), 1399);
    }

    #[test]
    fn rewind_returns_to_full_duration() {
        let mut clock = SessionClock::new(3, 1500);
        clock.start(T0);
        clock.tick(T0 + 60_000);
        clock.rewind();
        assert!(!clock.is_running());
        assert_eq!(clock.remaining_at(T0 + 120_000), 1500);
    }

    #[test]
    fn restore_paused_is_verbatim() {
        let clock = SessionClock::restore(&snapshot(1400, true, T0));
        assert_eq!(clock.remaining_at(T0 + 3_600_000), 1400);
        assert!(!clock.is_running());
    }

    #[test]
    fn restore_running_past_end_completes_on_first_tick() {
        let snap = PersistedSession {
            end_time: Some(T0 - 5_000),
            ..snapshot(300, false, T0)
        };
        let mut clock = SessionClock::restore(&snap);
        let tick = clock.tick(T0);
        assert!(tick.just_completed);
        assert_eq!(tick.remaining_secs, 0);
    }

    #[test]
    fn restore_running_without_anchor_clamps_to_completion() {
        let snap = PersistedSession {
            end_time: None,
            ..snapshot(300, false, T0)
        };
        let mut clock = SessionClock::restore(&snap);
        assert!(clock.tick(T0).just_completed);
    }

    proptest! {
        #[test]
        fn snapshot_round_trip_within_one_second(
            remaining in 1u64..=7200,
            paused: bool,
            elapsed_ms in 0i64..1500,
        ) {
            let snap = snapshot(remaining, paused, T0);
            let restored = SessionClock::restore(&snap);
            let got = restored.remaining_at(T0 + elapsed_ms);
            if paused {
                prop_assert_eq!(got, remaining);
            } else {
                prop_assert!(remaining - got <= 1);
            }
        }
    }
}
