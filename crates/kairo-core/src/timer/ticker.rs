//! Background tick source.
//!
//! One isolated tokio task per active countdown, waking the owner over a
//! channel at a nominal 1 Hz. The task never touches session state; the
//! owner recomputes remaining time from the clock anchor on each wake-up
//! and discards wake-ups whose `mode_id` no longer matches the live clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A wake-up message. Carries the mode identity captured at source creation
/// so the owner can ignore sources racing against a just-switched mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub mode_id: u32,
}

/// Handle to a running tick source. Dropping (or `stop`) aborts the task,
/// so a torn-down session can never leave an orphaned timer firing.
#[derive(Debug)]
pub struct TickSource {
    mode_id: u32,
    handle: JoinHandle<()>,
}

impl TickSource {
    /// Spawn a 1 Hz source for the given mode. Must be called from within a
    /// tokio runtime.
    pub fn spawn(mode_id: u32, tx: mpsc::Sender<Wakeup>) -> Self {
        Self::spawn_with_period(mode_id, tx, TICK_PERIOD)
    }

    /// Spawn with an explicit period. Missed ticks are skipped, not bursted:
    /// after a long stall the owner recomputes from the anchor anyway.
    pub fn spawn_with_period(mode_id: u32, tx: mpsc::Sender<Wakeup>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(Wakeup { mode_id }).await.is_err() {
                    break;
                }
            }
        });
        Self { mode_id, handle }
    }

    pub fn mode_id(&self) -> u32 {
        self.mode_id
    }

    /// Abort the task. Synchronous: once this returns no further wake-up
    /// will be queued by this source.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_wakeups_with_source_identity() {
        let (tx, mut rx) = mpsc::channel(4);
        let source = TickSource::spawn_with_period(42, tx, Duration::from_millis(5));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.mode_id, 42);
        assert_eq!(second.mode_id, 42);
        drop(source);
    }

    #[tokio::test]
    async fn stop_closes_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let source = TickSource::spawn_with_period(7, tx, Duration::from_millis(5));
        let _ = rx.recv().await;
        source.stop();
        drop(source);
        // Sender lives only in the aborted task, so the stream must end.
        while rx.recv().await.is_some() {}
    }
}
