//! # Kairo Core Library
//!
//! Core business logic for the Kairo focus/break timer: the session clock,
//! the mode catalog and the mode-transition state machine, with durable
//! snapshots so a session survives a full application reload. The CLI binary
//! is a thin layer over this library; visual shells are expected to be the
//! same.
//!
//! ## Architecture
//!
//! - **Session clock**: countdowns are anchored to an absolute end time and
//!   recomputed on every wake-up, never decremented per tick, so throttled
//!   or missed ticks cannot drift the timer
//! - **Tick source**: an isolated tokio task per countdown that wakes the
//!   owner over a channel; a wake-up is a trigger, not a source of truth
//! - **Storage**: SQLite session history and snapshot store, TOML-based
//!   configuration
//! - **Collaborators**: cue playback, ambient audio, notifications and tip
//!   text sit behind traits and degrade to no-ops
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: the RunState × family state machine
//! - [`SessionClock`]: anchor-based countdown arithmetic
//! - [`Database`]: history log and session snapshot persistence
//! - [`Config`]: application configuration management

pub mod catalog;
pub mod cues;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;
pub mod tips;

pub use catalog::{build_catalog, standard_index, Mode, SessionFamily, CUSTOM_BREAK_ID, CUSTOM_FOCUS_ID};
pub use cues::{AmbientController, AmbientTrack, Cue, CuePlayer, Notifier, NullCues};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use storage::{Config, Database, PersistedSession, SessionLogEntry};
pub use timer::{RunState, SessionClock, SessionEngine, TickSource, Wakeup};
pub use tips::{TipService, TipSource};
