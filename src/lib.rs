//! vmportal-sync - Refresh scheduling and settings synchronization
//!
//! This crate is the background data-refresh scheduler and user-settings
//! synchronization core of a VM-management web client. Page rendering, REST
//! transport, authentication and the VM/pool data model live elsewhere; this
//! crate reaches them through narrow trait seams and owns only the two hard
//! parts:
//!
//! - a cancellable, restartable **fixed-delay refresh scheduler** that drives
//!   periodic and on-demand data refresh for the current page, preserves
//!   already-elapsed wait time across interval changes, and stops cleanly on
//!   logout or token expiry (plus a sibling snooze timer that re-enables
//!   notifications after a configured pause), and
//! - a conflict-aware **settings synchronization engine** that tracks four
//!   snapshots of every editable value (current / base / draft / sent),
//!   drives save transactions against an external persist collaborator, and
//!   classifies outcomes as full success, partial success, complete failure
//!   or external conflict.
//!
//! # Module Structure
//!
//! - **`config`** - deployment configuration (refresh delay, snooze duration)
//! - **`error`** - error types shared across both halves
//! - **`scheduler`** - delay timer, scheduler context, refresh scheduler and
//!   notification snooze scheduler
//! - **`options`** - option field model, defaults, remote-options merging and
//!   the settings synchronization engine
//!
//! # Concurrency Model
//!
//! All loops run as tokio tasks with exactly two kinds of suspension point:
//! cancellable timer waits and awaited collaborator calls. A restartable loop
//! never holds a handle to its predecessor; instead every loop captures a
//! generation number at start and self-terminates as soon as the
//! process-wide counter has moved past it. See [`scheduler::SchedulerContext`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vmportal_sync::config::AppConfig;
//! use vmportal_sync::scheduler::{
//!     PageDescriptor, RefreshScheduler, SchedulerConfig, SchedulerContext,
//! };
//! # fn dispatcher() -> Arc<dyn vmportal_sync::scheduler::PageRefreshDispatcher> { unimplemented!() }
//!
//! # async fn example() -> Result<(), vmportal_sync::error::SchedulerError> {
//! let config = AppConfig::default();
//! let ctx = Arc::new(SchedulerContext::new());
//! let scheduler = RefreshScheduler::new(Arc::clone(&ctx), dispatcher());
//!
//! // Navigating to the VM list starts the refresh loop for that page.
//! scheduler.change_page(PageDescriptor::list(), config.refresh_delay()).await?;
//!
//! // Later: a saved updateRate restarts the loop with the new interval while
//! // keeping already-elapsed wait time.
//! scheduler
//!     .start(SchedulerConfig::fixed(config.refresh_delay()), PageDescriptor::list())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod options;
pub mod scheduler;
