//! Scheduler Context
//!
//! Explicit process-scoped state for the refresh scheduler: the generation
//! counter, the last-refresh timestamp, the current page and the liveness
//! gates (session token, server API version). Modelling these as one shared
//! context object - instead of ambient globals - pins down exactly who reads
//! and writes what:
//!
//! - the generation counter is bumped only by [`RefreshScheduler::start`]
//!   (via [`SchedulerContext::next_generation`]) and read by running loops;
//! - the last-refresh timestamp is written by the loop at the end of each
//!   cycle and read when a new start computes its effective start delay;
//! - the page and the gates are written by the host (navigation, session
//!   and version probes) and read by the loop before every dispatch.
//!
//! [`RefreshScheduler::start`]: crate::scheduler::RefreshScheduler::start

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::page::PageDescriptor;

/// Generation number identifying one scheduler loop instance.
pub type Generation = u64;

#[derive(Debug)]
struct ContextState {
    current_page: PageDescriptor,
    last_refresh: Option<Instant>,
    token_expired: bool,
    api_version_compatible: bool,
}

/// Process-scoped scheduler state.
///
/// A running loop captures the generation handed out by
/// [`next_generation`](Self::next_generation) and compares it against
/// [`current_generation`](Self::current_generation) after every suspension
/// point; a mismatch means a newer loop superseded it and it must terminate.
/// This detects stale loops without holding any handle to them.
#[derive(Debug)]
pub struct SchedulerContext {
    generation: AtomicU64,
    state: RwLock<ContextState>,
}

impl SchedulerContext {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: RwLock::new(ContextState {
                current_page: PageDescriptor::none(),
                last_refresh: None,
                token_expired: false,
                // optimistic until a version probe says otherwise
                api_version_compatible: true,
            }),
        }
    }

    /// Issue a generation for a new loop, superseding all previous ones.
    pub fn next_generation(&self) -> Generation {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The newest issued generation.
    pub fn current_generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `generation` is still the newest loop.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current_generation() == generation
    }

    pub async fn current_page(&self) -> PageDescriptor {
        self.state.read().await.current_page.clone()
    }

    pub async fn set_current_page(&self, page: PageDescriptor) {
        self.state.write().await.current_page = page;
    }

    /// Record that a refresh cycle just finished.
    pub async fn mark_refresh(&self) {
        self.state.write().await.last_refresh = Some(Instant::now());
    }

    /// Time since the last finished refresh cycle, if any.
    pub async fn elapsed_since_last_refresh(&self) -> Option<Duration> {
        self.state.read().await.last_refresh.map(|at| at.elapsed())
    }

    pub async fn is_token_expired(&self) -> bool {
        self.state.read().await.token_expired
    }

    /// Flip the session gate. Set on token expiry; cleared on re-login.
    pub async fn set_token_expired(&self, expired: bool) {
        self.state.write().await.token_expired = expired;
    }

    pub async fn is_api_version_compatible(&self) -> bool {
        self.state.read().await.api_version_compatible
    }

    /// Flip the server-version gate. Incompatible only skips ticks; the
    /// server may become compatible again after an upgrade.
    pub async fn set_api_version_compatible(&self, compatible: bool) {
        self.state.write().await.api_version_compatible = compatible;
    }
}

impl Default for SchedulerContext {
    fn default() -> Self {
        Self::new()
    }
}
