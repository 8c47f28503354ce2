//! Best-effort tip and insight text.
//!
//! A [`TipSource`] is an external text generator (remote model, script,
//! anything). Fetches are bounded by a timeout and every failure path
//! resolves to a static fallback string: the session flow never waits on a
//! stalled collaborator and never sees an error from this module.

use std::time::Duration;

use rand::seq::SliceRandom;

use crate::catalog::SessionFamily;
use crate::error::CoreError;

/// How long a source may take before the fallback wins.
const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

pub const FALLBACK_INSIGHT: &str = "Great session. Consistency is the path to mastery.";

pub const FALLBACK_TIPS: &[&str] = &[
    "Find your center.",
    "Silence is the canvas of thought.",
    "Breathe in focus, breathe out distraction.",
    "One step at a time.",
    "Flow like water.",
    "Be present in this moment.",
    "Stillness speaks.",
    "Deep work, deep life.",
    "The obstacle is the way.",
    "Focus is the art of subtraction.",
    "Simplicity is the ultimate sophistication.",
    "Don't watch the clock; do what it does.",
    "Energy flows where attention goes.",
    "Quiet the mind, and the soul will speak.",
    "Clarity comes from action.",
    "Respect the process.",
    "Now is the only time there is.",
    "Mastery requires patience.",
    "Inhale confidence, exhale doubt.",
    "Your focus determines your reality.",
];

/// An external tip/insight text generator.
pub trait TipSource: Send + Sync {
    fn fetch_tip(
        &self,
        duration_minutes: f64,
    ) -> impl std::future::Future<Output = Result<String, CoreError>> + Send;

    fn fetch_insight(
        &self,
        duration_minutes: f64,
        family: SessionFamily,
    ) -> impl std::future::Future<Output = Result<String, CoreError>> + Send;
}

/// Uninhabited source for offline operation.
pub enum NoSource {}

impl TipSource for NoSource {
    async fn fetch_tip(&self, _duration_minutes: f64) -> Result<String, CoreError> {
        match *self {}
    }

    async fn fetch_insight(
        &self,
        _duration_minutes: f64,
        _family: SessionFamily,
    ) -> Result<String, CoreError> {
        match *self {}
    }
}

/// Wraps an optional source with timeout and fallback handling.
pub struct TipService<S = NoSource> {
    source: Option<S>,
}

impl TipService<NoSource> {
    /// A service with no source: always answers from the fallback list.
    pub fn offline() -> Self {
        Self { source: None }
    }
}

impl<S: TipSource> TipService<S> {
    pub fn new(source: S) -> Self {
        Self { source: Some(source) }
    }

    /// A short focus tip for the given session length. Never errors.
    pub async fn tip(&self, duration_minutes: f64) -> String {
        let Some(source) = &self.source else {
            return fallback_tip();
        };
        match tokio::time::timeout(FETCH_TIMEOUT, source.fetch_tip(duration_minutes)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            _ => fallback_tip(),
        }
    }

    /// A closing insight for a finished session. Never errors.
    pub async fn insight(&self, duration_minutes: f64, family: SessionFamily) -> String {
        let Some(source) = &self.source else {
            return FALLBACK_INSIGHT.to_string();
        };
        match tokio::time::timeout(
            FETCH_TIMEOUT,
            source.fetch_insight(duration_minutes, family),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            _ => FALLBACK_INSIGHT.to_string(),
        }
    }
}

fn fallback_tip() -> String {
    FALLBACK_TIPS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_TIPS[0])
        .to_string()
}
