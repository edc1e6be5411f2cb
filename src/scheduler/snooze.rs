//! Notification Snooze Scheduler
//!
//! A single-shot cancellable timer behind "don't disturb": when the user
//! snoozes notifications for a while, this scheduler re-enables them after
//! the configured duration - unless the user re-enabled them manually first,
//! in which case the pending snooze is cancelled.
//!
//! Unlike the refresh scheduler there is no generation tracking here: only
//! an explicit `stop` can race with completion, and completion observes the
//! cancel signal before acting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::{debug, info};

use super::timer::{cancel_pair, CancelHandle, DelayTimer};

/// Invoked when a snooze expires naturally; re-enables notifications (the
/// host routes this through the settings engine, flipping the
/// show-notifications field back on).
pub type ResumeNotifications = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Re-enables notifications after a configurable pause.
pub struct NotificationSnoozeScheduler {
    resume: ResumeNotifications,
    stop_handle: Mutex<Option<CancelHandle>>,
    counter: AtomicU64,
}

impl NotificationSnoozeScheduler {
    pub fn new(resume: ResumeNotifications) -> Self {
        Self {
            resume,
            stop_handle: Mutex::new(None),
            counter: AtomicU64::new(0),
        }
    }

    /// Snooze notifications for `duration`, replacing any snooze in
    /// progress. When the wait completes without cancellation the resume
    /// callback runs.
    pub fn start_snooze(&self, duration: Duration) {
        let cancel = {
            let (handle, signal) = cancel_pair();
            let mut slot = self.stop_handle.lock().expect("snooze stop lock");
            if let Some(previous) = slot.replace(handle) {
                previous.fire();
            }
            signal
        };

        let timer_id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(snooze = timer_id, secs = duration.as_secs(), "snoozing notifications");

        let resume = Arc::clone(&self.resume);
        let mut cancel = cancel;
        tokio::spawn(async move {
            if DelayTimer::wait(duration, &mut cancel).await.cancelled {
                debug!(snooze = timer_id, "snooze cancelled");
                return;
            }
            info!(snooze = timer_id, "snooze elapsed, resuming notifications");
            resume().await;
        });
    }

    /// Cancel a snooze in progress (the user re-enabled notifications
    /// manually). Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self.stop_handle.lock().expect("snooze stop lock").as_ref() {
            handle.fire();
        }
    }
}

impl Drop for NotificationSnoozeScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
