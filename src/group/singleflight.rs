//! Single-Flight Coalescer
//!
//! Guarantees at most one in-flight origin load per key. The first caller
//! for a key becomes the leader and runs the load; everyone else waits on
//! a watch channel and receives a clone of the leader's outcome, error or
//! not. The pending entry is removed before waiters are signalled, so the
//! next caller after completion starts a fresh load.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cache::ValueView;
use crate::error::{CacheError, Result};

type Outcome = Result<ValueView>;

pub struct Flight {
    pending: Mutex<HashMap<String, watch::Receiver<Option<Outcome>>>>,
}

/// Removes the pending entry when the leader finishes or is cancelled
/// mid-load. On cancellation the sender is dropped unsent, which wakes
/// every waiter with an error instead of leaving them parked forever.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<String, watch::Receiver<Option<Outcome>>>>,
    key: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.key);
    }
}

impl Flight {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `work` for `key`, or joins an in-flight run of it.
    pub async fn fly<F, Fut>(&self, key: &str, work: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let tx = match self.join_or_lead(key) {
            JoinOrLead::Join(mut rx) => return wait_for_leader(&mut rx).await,
            JoinOrLead::Lead(tx) => tx,
        };

        let guard = PendingGuard {
            pending: &self.pending,
            key: key.to_string(),
        };

        let outcome = work().await;

        drop(guard);
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    /// Synchronous lock-and-decide step, kept out of the async fn body so
    /// the `MutexGuard` never needs to live across an `.await` point.
    fn join_or_lead(&self, key: &str) -> JoinOrLead {
        let mut pending = self.pending.lock();
        if let Some(rx) = pending.get(key) {
            return JoinOrLead::Join(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        pending.insert(key.to_string(), rx);
        JoinOrLead::Lead(tx)
    }
}

enum JoinOrLead {
    Join(watch::Receiver<Option<Outcome>>),
    Lead(watch::Sender<Option<Outcome>>),
}

impl Default for Flight {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_leader(rx: &mut watch::Receiver<Option<Outcome>>) -> Outcome {
    loop {
        if let Some(outcome) = rx.borrow().clone() {
            return outcome;
        }
        if rx.changed().await.is_err() {
            // Leader dropped without publishing.
            return Err(CacheError::Internal(
                "in-flight load was abandoned".to_string(),
            ));
        }
    }
}
