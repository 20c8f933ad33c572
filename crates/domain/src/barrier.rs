// Rust guideline compliant 2026-02-23

//! Counting readiness barrier gating version-by-version progression.
//!
//! A waiter blocks until a configured number of signals have accumulated;
//! signals may arrive before or after the wait begins, and only the
//! cumulative count matters, never the order of individual releases.

use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

/// Counting readiness primitive.
///
/// [`release_n`](Self::release_n) never blocks and is safe before any
/// acquire; [`acquire`](Self::acquire) completes once cumulative permits
/// reach the requested count and then consumes exactly that many. The
/// permit count never goes negative.
///
/// Cancellation: dropping the future returned by `acquire` (e.g. through
/// `tokio::time::timeout`) abandons the wait without consuming permits;
/// callers treat a cancelled acquire as a fatal abort of the run.
#[derive(Debug, Default)]
pub struct Barrier {
    permits: Mutex<u64>,
    notify: Notify,
}

impl Barrier {
    /// Create a barrier with zero permits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            notify: Notify::new(),
        }
    }

    /// Release one permit.
    pub fn release(&self) {
        self.release_n(1);
    }

    /// Release `n` permits at once. Never blocks; safe from any concurrent
    /// caller and before any acquire.
    pub fn release_n(&self, n: u64) {
        {
            let mut permits = self.lock_permits();
            *permits += n;
        }
        self.notify.notify_waiters();
    }

    /// Wait until at least `n` permits have been released cumulatively,
    /// then consume exactly `n`.
    ///
    /// Supports `n > 1` (waiting for all producers) as well as `n == 1`
    /// (waiting for a single load-completion signal).
    pub async fn acquire(&self, n: u64) {
        // Register interest before each state check so a release between
        // the check and the await cannot be lost.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        loop {
            notified.as_mut().enable();
            {
                let mut permits = self.lock_permits();
                if *permits >= n {
                    *permits -= n;
                    return;
                }
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }

    /// Currently available (released but unconsumed) permits.
    #[must_use]
    pub fn available(&self) -> u64 {
        *self.lock_permits()
    }

    fn lock_permits(&self) -> std::sync::MutexGuard<'_, u64> {
        // No code path panics while holding the lock; recover from
        // poisoning instead of propagating it.
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
