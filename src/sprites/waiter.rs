//! One-shot waits on a sprite reaching a named state.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Waiter {
    states: Vec<String>,
    resolved: Arc<AtomicBool>,
    signal: Sender<()>,
}

/// Handle returned by [`WaiterRegistry::register`].
///
/// Dropping the handle abandons the wait. The registry forgets the entry the
/// next time it is counted or resolved.
#[derive(Debug)]
pub struct WaitHandle {
    resolved: Arc<AtomicBool>,
    signal: Receiver<()>,
}

impl WaitHandle {
    /// Blocks until the wait resolves. Returns `false` if the sprite was
    /// dropped or restored before reaching any of the states.
    pub fn wait(&self) -> bool {
        if self.is_resolved() {
            return true;
        }
        self.signal.recv().is_ok() || self.is_resolved()
    }

    /// Non-blocking poll for cooperative schedulers.
    pub fn try_wait(&self) -> bool {
        if self.is_resolved() {
            return true;
        }
        match self.signal.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => self.is_resolved(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

/// The waiters registered on one sprite.
///
/// Clones share the same list, so other threads can register waits while
/// the sprite is driven elsewhere. The lock is only held while the list is
/// being changed, never while a caller blocks.
#[derive(Clone, Default)]
pub struct WaiterRegistry {
    waiters: Arc<Mutex<Vec<Waiter>>>,
}

impl std::fmt::Debug for WaiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaiterRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

impl WaiterRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<Waiter>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register<I, S>(&self, states: I) -> WaitHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (signal, receiver) = bounded(1);
        let resolved = Arc::new(AtomicBool::new(false));
        self.lock().push(Waiter {
            states: states.into_iter().map(Into::into).collect(),
            resolved: resolved.clone(),
            signal,
        });
        WaitHandle {
            resolved,
            signal: receiver,
        }
    }

    /// Number of unresolved waiters whose handle is still held.
    pub fn len(&self) -> usize {
        let mut waiters = self.lock();
        prune(&mut waiters);
        waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves and removes every waiter listening for `state`.
    /// Returns how many were resolved.
    pub(crate) fn resolve(&self, state: &str) -> usize {
        let mut waiters = self.lock();
        prune(&mut waiters);
        let before = waiters.len();
        waiters.retain(|waiter| {
            if !waiter.states.iter().any(|s| s == state) {
                return true;
            }
            waiter.resolved.store(true, Ordering::Release);
            // A full channel or a dropped handle both mean nobody is left to tell.
            let _ = waiter.signal.try_send(());
            false
        });
        before - waiters.len()
    }

    /// Drops every waiter unresolved, waking blocked callers with `false`.
    pub(crate) fn abandon_all(&self) {
        self.lock().clear();
    }
}

/// Drops entries whose handle was dropped.
fn prune(waiters: &mut Vec<Waiter>) {
    waiters.retain(|waiter| Arc::strong_count(&waiter.resolved) > 1);
}
