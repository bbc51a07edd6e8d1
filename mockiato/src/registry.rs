//! Pairs outgoing requests with the decisions that come back for them.

use crate::{data::Decision, error::Error};
use futures::Future;
use log::debug;
use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};
use tokio::sync::oneshot;

type PendingMap = Arc<Mutex<HashMap<String, Slot>>>;

#[derive(Debug)]
struct Slot {
    ticket: u64,
    sender: oneshot::Sender<Decision>,
}

/// Maps a correlation id to the single continuation waiting for it.
///
/// An entry is removed exactly once: by the dispatch that resolves it, or by
/// dropping the [`PendingDecision`] that owns it.
#[derive(Debug, Clone, Default)]
pub struct CorrelationRegistry {
    pending: PendingMap,
    tickets: Arc<AtomicU64>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` and returns the future that completes with its decision.
    ///
    /// The entry is in place when this returns, so a reply dispatched right
    /// after (even before the future is first polled) is not lost.
    pub fn register<S: Into<String>>(&self, id: S) -> PendingDecision {
        let id = id.into();
        let (sender, receiver) = oneshot::channel();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        if lock(&self.pending)
            .insert(id.clone(), Slot { ticket, sender })
            .is_some()
        {
            debug!("correlation id {} re-registered, previous waiter abandoned", id);
        }

        PendingDecision {
            id,
            ticket,
            receiver,
            pending: self.pending.clone(),
        }
    }

    /// Hands `decision` to the continuation registered under `id`.
    ///
    /// Returns `false` when nothing was waiting: the id was never registered,
    /// was already resolved, or its waiter is gone. Never blocks on the waiter.
    pub fn dispatch(&self, id: &str, decision: Decision) -> bool {
        let slot = lock(&self.pending).remove(id);

        match slot {
            Some(slot) => slot.sender.send(decision).is_ok(),
            None => {
                debug!("dropping decision for unknown correlation id {}", id);
                false
            }
        }
    }

    /// Resolves the continuation registered under `id` with
    /// [`Error::DecisionAbandoned`], for a reply that arrived but was unusable.
    pub fn fail(&self, id: &str) -> bool {
        match lock(&self.pending).remove(id) {
            Some(slot) => {
                debug!("correlation id {} failed", id);
                !slot.sender.is_closed()
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.pending).contains_key(id)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        lock(&self.pending).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Every critical section is a single insert or remove, so the map stays
// consistent even if a holder panicked.
fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<String, Slot>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves with the decision for one correlation id.
///
/// Dropping it unresolved removes the registry entry.
#[derive(Debug)]
pub struct PendingDecision {
    id: String,
    ticket: u64,
    receiver: oneshot::Receiver<Decision>,
    pending: PendingMap,
}

impl PendingDecision {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingDecision {
    type Output = Result<Decision, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| Error::DecisionAbandoned))
    }
}

impl Drop for PendingDecision {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        // a re-registration of the same id owns the slot now
        let owned = pending
            .get(&self.id)
            .map_or(false, |slot| slot.ticket == self.ticket);

        if owned {
            pending.remove(&self.id);
            debug!("correlation id {} abandoned before its decision arrived", self.id);
        }
    }
}
