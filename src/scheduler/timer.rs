//! Delay Timer
//!
//! A cancellable sleep primitive: [`DelayTimer::wait`] races a duration
//! against an external cancel signal and reports which side won. This is the
//! only waiting mechanism the schedulers use, so every wait in the crate is
//! stoppable the same way.

use std::time::Duration;

use tokio::sync::watch;

/// Fire-once cancellation handle.
///
/// Firing after the paired wait already elapsed is a no-op, and dropping the
/// handle without firing never cancels a wait.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn fire(&self) {
        // Waiters may be long gone; that is fine.
        let _ = self.tx.send(true);
    }

    /// Whether the handle has been fired.
    pub fn fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// A fresh signal observing this handle.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

/// Receiving side of a [`CancelHandle`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Resolve once the paired handle fires. Pends forever if the handle is
    /// dropped unfired.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected cancel handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Outcome of a cancellable wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    /// `true` when the wait ended because the cancel signal fired
    pub cancelled: bool,
}

/// Cancellable sleep
#[derive(Debug)]
pub struct DelayTimer;

impl DelayTimer {
    /// Suspend until `duration` elapses or `cancel` fires, whichever comes
    /// first. A zero duration returns immediately, not cancelled.
    pub async fn wait(duration: Duration, cancel: &mut CancelSignal) -> WaitOutcome {
        if duration.is_zero() {
            return WaitOutcome { cancelled: false };
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => WaitOutcome { cancelled: false },
            _ = cancel.cancelled() => WaitOutcome { cancelled: true },
        }
    }
}
