//! Cooperative stop signals shared between the dispatcher, the workers and whoever owns them.
//!
//! Both primitives are built on the same trick: a `crossbeam_channel` that never carries a
//! message. Dropping its only sender disconnects every receiver at once, which wakes any
//! thread parked in a `select!` on it. That gives us a wait that can be interrupted without
//! thread interruption support from the OS.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Cancellation token handed to every long-lived actor.
///
/// Cloning is cheap and every clone observes the same state. `cancel` is idempotent.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
    cancelled_rx: Receiver<()>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(tx)),
            }),
            cancelled_rx: rx,
        }
    }

    /// Requests shutdown and wakes every actor blocked on `cancelled()`
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let trigger = match self.inner.trigger.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(trigger);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once `cancel` has been called.
    /// Meant to sit next to a data channel in `crossbeam_channel::select!`.
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.cancelled_rx
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Fires the input-exhausted latch. Dropping it without calling `fire` fires it too, so
/// the latch is released on error paths as well.
#[derive(Debug)]
pub struct ExhaustedTrigger {
    _tx: Sender<()>,
}

impl ExhaustedTrigger {
    pub fn fire(self) {}
}

/// Single-fire latch telling observers that the dispatcher has enqueued its last work item
#[derive(Debug, Clone)]
pub struct InputExhausted {
    rx: Receiver<()>,
}

impl InputExhausted {
    pub fn new() -> (ExhaustedTrigger, Self) {
        let (tx, rx) = bounded(0);
        (ExhaustedTrigger { _tx: tx }, Self { rx })
    }

    pub fn is_set(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Returns `true` if the latch fired before the timeout
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}
