//! Cooperative shutdown
//!
//! [`ShutdownController`] owns the cancel side and is wired to SIGINT/SIGTERM
//! by [`ShutdownController::install`]. The listener only ever sees a
//! [`ShutdownToken`], which can be queried and slept on but not cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use serial_link::Sleeper;

#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Read-only view of the running flag
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    shared: Arc<Shared>,
}

impl ShutdownToken {
    /// `true` until shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        !self.is_running()
    }

    /// Sleep for `duration`, returning early if shutdown is requested
    ///
    /// Returns `true` if the full duration elapsed while still running.
    pub fn sleep(&self, duration: Duration) -> bool {
        let guard = self.shared.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (_guard, _timeout) = self
            .shared
            .wake
            .wait_timeout_while(guard, duration, |_| self.is_running())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_running()
    }
}

impl Sleeper for ShutdownToken {
    fn sleep(&self, duration: Duration) {
        ShutdownToken::sleep(self, duration);
    }
}

/// Owner of the cancel side of the running flag
#[derive(Debug, Clone)]
pub struct ShutdownController {
    shared: Arc<Shared>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(true),
                lock: Mutex::new(()),
                wake: Condvar::new(),
            }),
        }
    }

    /// Create a controller whose token is cancelled on SIGINT or SIGTERM
    ///
    /// Only one handler can be installed per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let controller = Self::new();
        let handler = controller.clone();

        ctrlc::set_handler(move || {
            if handler.cancel() {
                tracing::info!("Termination requested, stopping after current operation...");
            }
        })?;

        Ok(controller)
    }

    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Flip the flag to stopped and wake any sleeper
    ///
    /// Idempotent; returns `true` only for the call that performed the flip.
    pub fn cancel(&self) -> bool {
        let flipped = self
            .shared
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if flipped {
            // Take the lock so a sleeper between its check and its wait cannot miss this.
            let _guard = self.shared.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.shared.wake.notify_all();
        }

        flipped
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
