//! Session engine: the RunState × family state machine.
//!
//! The engine owns the active catalog, the session clock, the database and
//! the cue collaborators. Commands return `Some(Event)` when they change
//! state and `None` when invalid in the current state; the caller decides
//! what to surface.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |            |
//!           +-- exit/skip/complete --> Idle (next family selected)
//! ```
//!
//! The in-flight session is shadowed to the database on every tick and on
//! every pause/resume/switch, so a reload resumes within one tick of truth.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, Mode, SessionFamily, CUSTOM_BREAK_ID, CUSTOM_FOCUS_ID};
use crate::cues::{completion_body, AmbientController, AmbientTrack, Cue, CuePlayer, Notifier, NullCues};
use crate::error::CoreError;
use crate::events::Event;
use crate::storage::database::local_day_start_ms;
use crate::storage::{Config, Database, PersistedSession, SessionLogEntry};

use super::clock::{now_ms, SessionClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// No active countdown; the catalog is being browsed.
    Idle,
    Running,
    /// Countdown frozen, remaining time fixed.
    Paused,
}

/// Notification title used for completion notices.
const NOTIFY_TITLE: &str = "KAIRO";

pub struct SessionEngine {
    db: Database,
    config: Config,
    family: SessionFamily,
    run_state: RunState,
    catalog: Vec<Mode>,
    active_index: usize,
    clock: Option<SessionClock>,
    session_ordinal: u32,
    cues: Box<dyn CuePlayer>,
    ambient: Box<dyn AmbientController>,
    notifier: Box<dyn Notifier>,
}

impl SessionEngine {
    /// A fresh engine: idle, focus family, standard mode selected.
    pub fn new(db: Database, config: Config) -> Self {
        let catalog = catalog::build_catalog(
            SessionFamily::Focus,
            config.timer.custom_focus_seconds,
            config.timer.custom_break_seconds,
        );
        let active_index = catalog::standard_index(&catalog, &config.timer.standard_focus_label);
        Self {
            db,
            config,
            family: SessionFamily::Focus,
            run_state: RunState::Idle,
            catalog,
            active_index,
            clock: None,
            session_ordinal: 1,
            cues: Box::new(NullCues),
            ambient: Box::new(NullCues),
            notifier: Box::new(NullCues),
        }
    }

    pub fn with_cues(mut self, cues: Box<dyn CuePlayer>) -> Self {
        self.cues = cues;
        self
    }

    pub fn with_ambient(mut self, ambient: Box<dyn AmbientController>) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn family(&self) -> SessionFamily {
        self.family
    }

    /// 1-based ordinal of the current focus session among today's
    /// completions. Meaningful while a session is active.
    pub fn session_ordinal(&self) -> u32 {
        self.session_ordinal
    }

    pub fn catalog(&self) -> &[Mode] {
        &self.catalog
    }

    pub fn active_mode(&self) -> &Mode {
        let idx = self.active_index.min(self.catalog.len().saturating_sub(1));
        &self.catalog[idx]
    }

    /// Identity of the mode the live clock is counting for; the selected
    /// mode when no clock exists.
    pub fn active_mode_id(&self) -> u32 {
        self.clock
            .as_ref()
            .map(|c| c.mode_id())
            .unwrap_or_else(|| self.active_mode().id)
    }

    pub fn remaining_seconds(&self) -> u64 {
        match &self.clock {
            Some(clock) => clock.remaining_at(now_ms()),
            None => self.active_mode().total_seconds(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let mode = self.active_mode();
        Event::StateSnapshot {
            run_state: self.run_state,
            family: self.family,
            mode_id: mode.id,
            mode_label: mode.label.clone(),
            remaining_secs: self.remaining_seconds(),
            total_secs: self
                .clock
                .as_ref()
                .map(|c| c.total_seconds())
                .unwrap_or_else(|| mode.total_seconds()),
            session_ordinal: self.session_ordinal,
            at: Utc::now(),
        }
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Select a catalog entry by id. Only meaningful while idle.
    pub fn select_mode(&mut self, mode_id: u32) -> Result<(), CoreError> {
        if self.run_state != RunState::Idle {
            return Err(CoreError::Custom("a session is already active".into()));
        }
        match self.catalog.iter().position(|m| m.id == mode_id) {
            Some(idx) => {
                self.active_index = idx;
                Ok(())
            }
            None => Err(CoreError::Custom(format!(
                "unknown mode id {mode_id} for {}",
                self.family.as_str()
            ))),
        }
    }

    /// Swap in a new configuration and rebuild the catalog. The selection
    /// clamps to the first entry if the catalog shrank under it.
    pub fn update_config(&mut self, config: Config) {
        self.config = config;
        self.rebuild_catalog();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.run_state != RunState::Idle {
            return None;
        }
        let now = now_ms();
        let mode = self.active_mode().clone();
        let mut clock = SessionClock::new(mode.id, mode.total_seconds());
        clock.start(now);
        self.clock = Some(clock);
        self.run_state = RunState::Running;
        self.session_ordinal = self.current_ordinal();
        self.persist(now);
        self.cue(Cue::Start);
        self.ambient_start();
        Some(Event::SessionStarted {
            mode_id: mode.id,
            family: self.family,
            duration_secs: mode.total_seconds(),
            session_ordinal: self.session_ordinal,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let now = now_ms();
        let remaining = {
            let clock = self.clock.as_mut()?;
            clock.pause(now);
            clock.remaining_at(now)
        };
        self.run_state = RunState::Paused;
        self.persist(now);
        self.cue(Cue::Pause);
        self.ambient.stop();
        Some(Event::SessionPaused {
            remaining_secs: remaining,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.run_state != RunState::Paused {
            return None;
        }
        let now = now_ms();
        let remaining = {
            let clock = self.clock.as_mut()?;
            clock.start(now);
            clock.remaining_at(now)
        };
        self.run_state = RunState::Running;
        self.persist(now);
        self.cue(Cue::Start);
        self.ambient_start();
        Some(Event::SessionResumed {
            remaining_secs: remaining,
            at: Utc::now(),
        })
    }

    /// Rewind to the full duration, frozen on the session screen. The
    /// snapshot is cleared; nothing resumes until an explicit start.
    pub fn reset(&mut self) -> Option<Event> {
        if self.run_state == RunState::Idle {
            return None;
        }
        let total = {
            let clock = self.clock.as_mut()?;
            clock.rewind();
            clock.total_seconds()
        };
        self.run_state = RunState::Paused;
        self.clear_persisted();
        self.cue(Cue::Reset);
        self.ambient.stop();
        Some(Event::SessionReset {
            total_secs: total,
            at: Utc::now(),
        })
    }

    /// Abandon the session. Leaving a break lands back on the standard
    /// focus mode, never on a stale break duration.
    pub fn exit(&mut self) -> Option<Event> {
        if self.run_state == RunState::Idle {
            return None;
        }
        self.clock = None;
        self.run_state = RunState::Idle;
        self.clear_persisted();
        self.ambient.stop();
        if self.family == SessionFamily::Break {
            self.family = SessionFamily::Focus;
            self.rebuild_catalog();
            self.active_index = self.standard_focus_index();
        }
        Some(Event::SessionExited {
            family: self.family,
            at: Utc::now(),
        })
    }

    /// Abandon a break early. Not a completion: no history entry.
    pub fn skip(&mut self) -> Option<Event> {
        if self.family != SessionFamily::Break || self.run_state == RunState::Idle {
            return None;
        }
        self.clock = None;
        self.run_state = RunState::Idle;
        self.clear_persisted();
        self.ambient.stop();
        self.family = SessionFamily::Focus;
        self.rebuild_catalog();
        self.active_index = self.standard_focus_index();
        Some(Event::BreakSkipped { at: Utc::now() })
    }

    /// Flip between focus and break. The old family's snapshot is cleared
    /// first so it cannot leak into the new context. Invoked from an active
    /// session (running or paused), the new family's default mode starts
    /// running immediately; invoked while idle it just changes the browsing
    /// family.
    pub fn switch_family(&mut self) -> Option<Event> {
        let now = now_ms();
        let was_active = self.run_state != RunState::Idle;
        self.clear_persisted();
        self.clock = None;
        self.ambient.stop();
        self.family = self.family.other();
        self.rebuild_catalog();
        self.active_index = match self.family {
            SessionFamily::Break => 0,
            SessionFamily::Focus => self.standard_focus_index(),
        };
        let mode = self.active_mode().clone();
        if was_active {
            let mut clock = SessionClock::new(mode.id, mode.total_seconds());
            clock.start(now);
            self.clock = Some(clock);
            self.run_state = RunState::Running;
            self.session_ordinal = self.current_ordinal();
            self.persist(now);
            self.ambient_start();
        } else {
            self.run_state = RunState::Idle;
        }
        Some(Event::FamilySwitched {
            family: self.family,
            mode_id: mode.id,
            running: was_active,
            at: Utc::now(),
        })
    }

    /// Wake-up entry point for tick sources. A wake-up whose mode identity
    /// no longer matches the live clock is a stale source racing a switch
    /// and is dropped.
    pub fn handle_wakeup(&mut self, mode_id: u32) -> Option<Event> {
        if self.clock.as_ref().map(|c| c.mode_id()) != Some(mode_id) {
            return None;
        }
        self.tick()
    }

    /// Recompute remaining time from the clock anchor. Call periodically
    /// while running. Returns the completion event when the countdown
    /// crosses zero; repeated calls after that are no-ops.
    pub fn tick(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let now = now_ms();
        let tick = self.clock.as_mut()?.tick(now);
        if tick.just_completed {
            return Some(self.handle_completion(now));
        }
        self.persist(now);
        None
    }

    /// Reinitialize from the persisted snapshot, if one is accepted by the
    /// freshly-built catalog. A session that finished while the application
    /// was closed completes immediately (history, transition, cues) instead
    /// of resuming a dead countdown. Returns the completion event in that
    /// case.
    pub fn restore(&mut self) -> Option<Event> {
        let snapshot = self.db.load_session()?;
        let catalog = catalog::build_catalog(
            snapshot.family,
            self.config.timer.custom_focus_seconds,
            self.config.timer.custom_break_seconds,
        );
        let index = catalog
            .iter()
            .position(|m| m.id == snapshot.mode_id)
            .or_else(|| {
                // Reserved custom ids map to whichever slot currently holds
                // a custom entry for the family.
                if snapshot.mode_id == CUSTOM_FOCUS_ID || snapshot.mode_id == CUSTOM_BREAK_ID {
                    catalog
                        .iter()
                        .position(|m| m.id == CUSTOM_FOCUS_ID || m.id == CUSTOM_BREAK_ID)
                } else {
                    None
                }
            });
        let Some(index) = index else {
            self.clear_persisted();
            return None;
        };

        self.family = snapshot.family;
        self.catalog = catalog;
        self.active_index = index;
        self.session_ordinal = snapshot.session_count;

        let mut clock = SessionClock::restore(&snapshot);
        if snapshot.is_paused {
            self.clock = Some(clock);
            self.run_state = RunState::Paused;
            return None;
        }

        let now = now_ms();
        let tick = clock.tick(now);
        self.clock = Some(clock);
        self.run_state = RunState::Running;
        if tick.just_completed {
            return Some(self.handle_completion(now));
        }
        self.persist(now);
        self.ambient_start();
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn handle_completion(&mut self, now: i64) -> Event {
        let mode = self.active_mode().clone();
        let finished_family = self.family;
        let duration_minutes = mode.exact_minutes();

        self.cue(Cue::Completed);
        self.ambient.stop();
        if self.config.notifications.enabled {
            self.notifier.send(NOTIFY_TITLE, &completion_body(&mode));
        }

        let entry = SessionLogEntry::new(duration_minutes, &mode.label, finished_family, now);
        let _ = self.db.append_session(&entry);
        self.clear_persisted();
        self.clock = None;

        self.family = finished_family.other();
        self.rebuild_catalog();
        self.active_index = match self.family {
            SessionFamily::Break => 0,
            SessionFamily::Focus => self.standard_focus_index(),
        };

        let auto = self.config.timer.auto_continue;
        if auto {
            let next = self.active_mode().clone();
            let mut clock = SessionClock::new(next.id, next.total_seconds());
            clock.start(now);
            self.clock = Some(clock);
            self.run_state = RunState::Running;
            self.session_ordinal = self.current_ordinal();
            self.persist(now);
            self.cue(Cue::Start);
            self.ambient_start();
        } else {
            self.run_state = RunState::Idle;
        }

        Event::SessionCompleted {
            mode_id: mode.id,
            family: finished_family,
            duration_minutes,
            next_family: self.family,
            auto_continued: auto,
            at: Utc::now(),
        }
    }

    fn rebuild_catalog(&mut self) {
        self.catalog = catalog::build_catalog(
            self.family,
            self.config.timer.custom_focus_seconds,
            self.config.timer.custom_break_seconds,
        );
        if self.active_index >= self.catalog.len() {
            self.active_index = 0;
        }
    }

    fn standard_focus_index(&self) -> usize {
        catalog::standard_index(&self.catalog, &self.config.timer.standard_focus_label)
    }

    fn current_ordinal(&self) -> u32 {
        self.db
            .count_since(local_day_start_ms(), SessionFamily::Focus)
            .unwrap_or(0)
            + 1
    }

    fn persist(&self, now: i64) {
        let Some(clock) = &self.clock else { return };
        let session = PersistedSession {
            mode_id: clock.mode_id(),
            family: self.family,
            end_time: clock.end_time_epoch_ms(),
            time_left: clock.remaining_at(now),
            total_duration: clock.total_seconds(),
            is_paused: !clock.is_running(),
            last_updated: now,
            session_count: self.session_ordinal,
        };
        // Shadow write; the next tick overwrites it.
        let _ = self.db.save_session(&session);
    }

    fn clear_persisted(&self) {
        let _ = self.db.clear_session();
    }

    fn cue(&self, cue: Cue) {
        if self.config.cues.sound_enabled {
            self.cues.play(cue);
        }
    }

    fn ambient_start(&self) {
        let track = self.config.cues.ambient_track;
        if track != AmbientTrack::Off {
            self.ambient.start(track);
        }
    }
}
