//! # Background Refresh Scheduler
//!
//! Drives periodic and on-demand data refresh for the page the user is
//! currently on. Exactly one fixed-delay loop is live at a time: starting a
//! scheduler always stops its predecessor first, and every loop re-checks a
//! process-wide generation counter after each suspension point so a stale
//! loop terminates itself even when nobody holds a handle to it.
//!
//! ## Components
//!
//! - [`DelayTimer`] - cancellable sleep primitive
//! - [`SchedulerContext`] - generation counter, last-refresh timestamp,
//!   current page and liveness gates
//! - [`RefreshScheduler`] - the fixed-delay loop supervisor
//! - [`NotificationSnoozeScheduler`] - single-shot timer that re-enables
//!   notifications after a pause
//!
//! ## Start delay
//!
//! Restarting the scheduler continues the previous wait period instead of
//! beginning a fresh one. Restarting the full wait each time would stretch
//! the gap between refreshes every time the user tweaks the interval - or
//! suppress refresh entirely while they keep tweaking it. With a 2 minute
//! interval and 1m30s already elapsed, switching to 5 minutes refreshes
//! after another 3m30s, giving intervals of 2min, 2min, 5min, 5min rather
//! than 2min, 2min, 6m30s, 5min.

pub mod context;
pub mod page;
pub mod snooze;
pub mod timer;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::SchedulerError;

pub use context::{Generation, SchedulerContext};
pub use page::{PageDescriptor, PageRefreshDispatcher, PageType, RefreshReason};
pub use snooze::NotificationSnoozeScheduler;
pub use timer::{cancel_pair, CancelHandle, CancelSignal, DelayTimer, WaitOutcome};

/// Only the first manual refresh inside this window is honored.
pub const MANUAL_REFRESH_THROTTLE: Duration = Duration::from_secs(5);

/// Per-start configuration of the refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Fixed delay between the end of one refresh and the start of the next
    pub delay: Duration,
    /// Explicit wait before the first refresh; when absent it is derived
    /// from the time already elapsed since the last refresh
    pub start_delay: Option<Duration>,
    /// Refresh immediately, ignoring any remaining wait
    pub immediate: bool,
}

impl SchedulerConfig {
    /// Periodic refresh every `delay`, continuing a previous wait period.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, start_delay: None, immediate: false }
    }

    /// Refresh now, then every `delay`.
    pub fn immediate(delay: Duration) -> Self {
        Self { delay, start_delay: None, immediate: true }
    }

    fn validate(&self) -> Result<(), SchedulerError> {
        if self.delay.is_zero() {
            return Err(SchedulerError::InvalidDelay { delay: self.delay });
        }
        Ok(())
    }
}

/// Effective wait before the first refresh of a new loop.
///
/// Immediate requests and explicit start delays win; otherwise the remaining
/// part of the configured delay is computed from the time already elapsed
/// since the last refresh. Never having refreshed counts as "everything
/// elapsed".
fn resolve_start_delay(config: &SchedulerConfig, elapsed: Option<Duration>) -> Duration {
    if config.immediate {
        return Duration::ZERO;
    }
    if let Some(start_delay) = config.start_delay {
        return start_delay;
    }
    match elapsed {
        Some(elapsed) => config.delay.saturating_sub(elapsed),
        None => Duration::ZERO,
    }
}

/// Supervisor of the single fixed-delay refresh loop.
///
/// `start` always stops the active loop before spawning a new one, so at
/// most one loop dispatches ticks at any time; rapid back-to-back starts are
/// additionally deduplicated by the generation check inside the loop.
pub struct RefreshScheduler {
    ctx: Arc<SchedulerContext>,
    dispatcher: Arc<dyn PageRefreshDispatcher>,
    stop_handle: Mutex<Option<CancelHandle>>,
    last_manual_refresh: Mutex<Option<Instant>>,
}

impl RefreshScheduler {
    pub fn new(ctx: Arc<SchedulerContext>, dispatcher: Arc<dyn PageRefreshDispatcher>) -> Self {
        Self {
            ctx,
            dispatcher,
            stop_handle: Mutex::new(None),
            last_manual_refresh: Mutex::new(None),
        }
    }

    /// Shared context, for host-side writers (navigation, session probes).
    pub fn context(&self) -> &Arc<SchedulerContext> {
        &self.ctx
    }

    /// Start (or restart) the fixed-delay loop for `target_page`.
    ///
    /// The first tick is attributed to a scheduled refresh; use
    /// [`change_page`](Self::change_page) or
    /// [`refresh_manually`](Self::refresh_manually) for user-driven starts.
    pub async fn start(
        &self,
        config: SchedulerConfig,
        target_page: PageDescriptor,
    ) -> Result<(), SchedulerError> {
        self.start_with_reason(config, target_page, RefreshReason::Schedule).await
    }

    /// Record a navigation and restart the loop with an immediate refresh of
    /// the new page.
    pub async fn change_page(
        &self,
        page: PageDescriptor,
        delay: Duration,
    ) -> Result<(), SchedulerError> {
        self.ctx.set_current_page(page.clone()).await;
        let config = SchedulerConfig {
            delay,
            start_delay: Some(Duration::ZERO),
            immediate: false,
        };
        self.start_with_reason(config, page, RefreshReason::Navigation).await
    }

    /// Refresh the current page now and restart the loop.
    ///
    /// Returns `false` without refreshing when a manual refresh was already
    /// honored within [`MANUAL_REFRESH_THROTTLE`].
    pub async fn refresh_manually(&self, delay: Duration) -> Result<bool, SchedulerError> {
        {
            let mut last = self.last_manual_refresh.lock().expect("manual refresh lock");
            let now = Instant::now();
            if let Some(previous) = *last {
                if now.duration_since(previous) < MANUAL_REFRESH_THROTTLE {
                    debug!("manual refresh dropped, previous one within throttle window");
                    return Ok(false);
                }
            }
            *last = Some(now);
        }

        let page = self.ctx.current_page().await;
        let config = SchedulerConfig {
            delay,
            start_delay: Some(Duration::ZERO),
            immediate: false,
        };
        self.start_with_reason(config, page, RefreshReason::Manual).await?;
        Ok(true)
    }

    /// Stop the active loop. Idempotent; a no-op when nothing runs.
    pub fn stop(&self) {
        if let Some(handle) = self.stop_handle.lock().expect("stop handle lock").as_ref() {
            handle.fire();
        }
    }

    /// Clear the current page and stop refreshing. Pairs with stopping any
    /// notification snooze; the host owns that sibling call.
    pub async fn logout(&self) {
        self.ctx.set_current_page(PageDescriptor::none()).await;
        self.stop();
    }

    async fn start_with_reason(
        &self,
        config: SchedulerConfig,
        target_page: PageDescriptor,
        first_reason: RefreshReason,
    ) -> Result<(), SchedulerError> {
        config.validate()?;

        // stop() happens-before the new loop's first wait
        let cancel = {
            let (handle, signal) = cancel_pair();
            let mut slot = self.stop_handle.lock().expect("stop handle lock");
            if let Some(previous) = slot.replace(handle) {
                previous.fire();
            }
            signal
        };

        let generation = self.ctx.next_generation();
        let elapsed = self.ctx.elapsed_since_last_refresh().await;
        let start_delay = resolve_start_delay(&config, elapsed);

        let ctx = Arc::clone(&self.ctx);
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(run_loop(
            ctx,
            dispatcher,
            config,
            target_page,
            first_reason,
            generation,
            start_delay,
            cancel,
        ));
        Ok(())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    ctx: Arc<SchedulerContext>,
    dispatcher: Arc<dyn PageRefreshDispatcher>,
    config: SchedulerConfig,
    target_page: PageDescriptor,
    first_reason: RefreshReason,
    generation: Generation,
    start_delay: Duration,
    mut cancel: CancelSignal,
) {
    info!(
        scheduler = generation,
        start_delay_secs = start_delay.as_secs(),
        delay_secs = config.delay.as_secs(),
        "starting fixed delay scheduler"
    );

    if DelayTimer::wait(start_delay, &mut cancel).await.cancelled {
        info!(scheduler = generation, "scheduler stopped during start delay");
        return;
    }

    let mut first_run = true;
    loop {
        if !ctx.is_current(generation) {
            info!(
                scheduler = generation,
                newest = ctx.current_generation(),
                "scheduler stopped, superseded by newer scheduler"
            );
            return;
        }

        if ctx.is_token_expired().await {
            info!(scheduler = generation, "scheduler stopped, session token expired");
            return;
        }

        if ctx.is_api_version_compatible().await {
            let reason = if first_run { first_reason } else { RefreshReason::Schedule };
            if target_page.refreshable() {
                debug!(scheduler = generation, page = ?target_page, ?reason, "dispatching refresh");
                if let Err(error) = dispatcher.refresh(&target_page, reason).await {
                    // one bad tick must not kill the loop
                    warn!(scheduler = generation, %error, "refresh tick failed");
                }
            }
            ctx.mark_refresh().await;
            first_run = false;
        } else {
            debug!(scheduler = generation, "tick skipped, server API version incompatible");
        }

        if DelayTimer::wait(config.delay, &mut cancel).await.cancelled {
            info!(scheduler = generation, "scheduler stopped");
            return;
        }
    }
}
