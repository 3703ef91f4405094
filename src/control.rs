//! Run/pause/cancel control shared between a matching run and its caller.
//!
//! A driving caller (status display, UI) holds the same [`MatchControl`]
//! it hands to [`crate::match_trace`], typically behind an `Arc`, and flips
//! the flags from another thread. The matcher consults the control once per
//! fix between steps: pausing only gates whether the next fix is processed
//! yet and never affects any computed value; cancelling aborts the run
//! without publishing partial matches.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::{AlignError, Result};

const STATUS_IDLE: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_PAUSED: u8 = 2;

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(10);

/// Externally observable state of a matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Idle,
    Running,
    Paused,
}

/// Shared control flag for one matching run.
///
/// Create a fresh control per run; cancellation is sticky.
#[derive(Debug, Default)]
pub struct MatchControl {
    status: AtomicU8,
    cancelled: AtomicBool,
}

impl MatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> MatchStatus {
        match self.status.load(Ordering::Acquire) {
            STATUS_RUNNING => MatchStatus::Running,
            STATUS_PAUSED => MatchStatus::Paused,
            _ => MatchStatus::Idle,
        }
    }

    /// Hold the run before its next fix.
    pub fn pause(&self) {
        self.status.store(STATUS_PAUSED, Ordering::Release);
    }

    /// Let a paused run continue.
    pub fn resume(&self) {
        self.status.store(STATUS_RUNNING, Ordering::Release);
    }

    /// Abort the run at its next per-fix check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn begin(&self) {
        self.status.store(STATUS_RUNNING, Ordering::Release);
    }

    pub(crate) fn finish(&self) {
        self.status.store(STATUS_IDLE, Ordering::Release);
    }

    /// Per-fix checkpoint: block while paused, fail once cancelled.
    pub(crate) fn checkpoint(&self) -> Result<()> {
        loop {
            if self.is_cancelled() {
                return Err(AlignError::Cancelled);
            }
            if self.status() != MatchStatus::Paused {
                return Ok(());
            }
            thread::sleep(PAUSE_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_status_transitions() {
        let control = MatchControl::new();
        assert_eq!(control.status(), MatchStatus::Idle);
        control.begin();
        assert_eq!(control.status(), MatchStatus::Running);
        control.pause();
        assert_eq!(control.status(), MatchStatus::Paused);
        control.resume();
        assert_eq!(control.status(), MatchStatus::Running);
        control.finish();
        assert_eq!(control.status(), MatchStatus::Idle);
    }

    #[test]
    fn test_checkpoint_passes_while_running() {
        let control = MatchControl::new();
        control.begin();
        assert!(control.checkpoint().is_ok());
    }

    #[test]
    fn test_cancel_fails_checkpoint() {
        let control = MatchControl::new();
        control.begin();
        control.cancel();
        assert_eq!(control.checkpoint(), Err(AlignError::Cancelled));
    }

    #[test]
    fn test_cancel_unblocks_paused_checkpoint() {
        let control = Arc::new(MatchControl::new());
        control.begin();
        control.pause();

        let remote = Arc::clone(&control);
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        assert_eq!(control.checkpoint(), Err(AlignError::Cancelled));
        canceller.join().unwrap();
    }
}
