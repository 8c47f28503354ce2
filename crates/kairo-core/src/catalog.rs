//! Mode catalog: the ordered lists of selectable durations.
//!
//! Each family (focus, break) has a static list of modes; a user-configured
//! custom duration is synthesized into the list at a reserved id. The catalog
//! is rebuilt, never mutated, whenever the custom configuration changes.

use serde::{Deserialize, Serialize};

/// Reserved id for the synthesized custom focus mode.
pub const CUSTOM_FOCUS_ID: u32 = 999;
/// Reserved id for the synthesized custom break mode.
pub const CUSTOM_BREAK_ID: u32 = 998;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionFamily {
    Focus,
    Break,
}

impl SessionFamily {
    pub fn other(self) -> Self {
        match self {
            SessionFamily::Focus => SessionFamily::Break,
            SessionFamily::Break => SessionFamily::Focus,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionFamily::Focus => "FOCUS",
            SessionFamily::Break => "BREAK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FOCUS" => Some(SessionFamily::Focus),
            "BREAK" => Some(SessionFamily::Break),
            _ => None,
        }
    }
}

/// A selectable named duration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub id: u32,
    pub label: String,
    /// Nominal duration in minutes. Fractional for custom modes.
    pub minutes: f64,
    /// Exact duration in seconds; overrides `minutes * 60` when present,
    /// enabling sub-minute durations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub description: String,
}

impl Mode {
    /// Total duration in whole seconds.
    pub fn total_seconds(&self) -> u64 {
        self.duration_seconds
            .unwrap_or_else(|| (self.minutes * 60.0).round() as u64)
    }

    /// Duration in minutes, fractional when an exact second count exists
    /// (e.g. 1.5 for a 90-second mode).
    pub fn exact_minutes(&self) -> f64 {
        match self.duration_seconds {
            Some(secs) => secs as f64 / 60.0,
            None => self.minutes,
        }
    }
}

fn mode(id: u32, label: &str, minutes: f64, description: &str) -> Mode {
    Mode {
        id,
        label: label.into(),
        minutes,
        duration_seconds: None,
        description: description.into(),
    }
}

/// The static focus durations, shortest first.
pub fn focus_modes() -> Vec<Mode> {
    vec![
        mode(1, "01", 5.0, "Quick reset. A short breath to center yourself."),
        mode(2, "02", 10.0, "Check emails. Clear the clutter before diving deep."),
        mode(3, "03", 25.0, "Standard Pomodoro. Deep focus with high intensity."),
        mode(4, "04", 45.0, "Deep Work. Extended period for complex problem solving."),
        mode(5, "05", 60.0, "Power Hour. Uninterrupted flow state."),
        mode(6, "06", 90.0, "Ultradian Rhythm. The maximum natural attention span."),
    ]
}

/// The static break durations, shortest first.
pub fn break_modes() -> Vec<Mode> {
    vec![
        mode(101, "B1", 5.0, "Short Break. Stretch and hydrate."),
        mode(102, "B2", 15.0, "Long Break. Walk around or meditate."),
        mode(103, "B3", 30.0, "Meal Break. Refuel and disconnect."),
    ]
}

/// Sanitize a configured custom duration. Negative, zero, NaN and infinite
/// values all mean "no custom entry".
fn sanitize_custom_seconds(seconds: f64) -> Option<u64> {
    if !seconds.is_finite() || seconds < 1.0 {
        return None;
    }
    Some(seconds.floor() as u64)
}

fn custom_mode(family: SessionFamily, total_seconds: u64) -> Mode {
    let mins = total_seconds / 60;
    let secs = total_seconds % 60;
    let (id, description) = match family {
        SessionFamily::Focus => (
            CUSTOM_FOCUS_ID,
            format!("Custom {mins}m {secs}s session. Your personalized flow."),
        ),
        SessionFamily::Break => (CUSTOM_BREAK_ID, format!("Custom Break: {mins}m {secs}s.")),
    };
    Mode {
        id,
        label: "C".into(),
        minutes: total_seconds as f64 / 60.0,
        duration_seconds: Some(total_seconds),
        description,
    }
}

/// Build the ordered catalog for a family, prepending a synthesized custom
/// entry when the corresponding duration is configured (> 0 seconds).
///
/// Pure and deterministic; callers must re-resolve any positional lookups
/// (like the standard mode) after every rebuild.
pub fn build_catalog(
    family: SessionFamily,
    custom_focus_seconds: f64,
    custom_break_seconds: f64,
) -> Vec<Mode> {
    let (mut modes, custom) = match family {
        SessionFamily::Focus => (focus_modes(), sanitize_custom_seconds(custom_focus_seconds)),
        SessionFamily::Break => (break_modes(), sanitize_custom_seconds(custom_break_seconds)),
    };
    if let Some(total) = custom {
        modes.insert(0, custom_mode(family, total));
    }
    modes
}

/// Position of the standard reference mode, resolved by label.
///
/// The position shifts whenever a custom entry is prepended, so this must be
/// re-run against the freshly built catalog, never cached as an index. An
/// absent label falls back to the first entry.
pub fn standard_index(catalog: &[Mode], standard_label: &str) -> usize {
    catalog
        .iter()
        .position(|m| m.label == standard_label)
        .unwrap_or(0)
}
