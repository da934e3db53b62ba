//! Per-address observation subscriptions.
//!
//! Each subscriber owns an unbounded channel. Subscribing replays the
//! address's past events into the fresh channel before registering it, and
//! stores publish while holding their own write lock, so a subscriber sees
//! every event exactly once and in store order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use atomkit_core::Address;

use crate::error::{Result, StoreError};
use crate::observation::AtomObservation;

/// Identifier of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

/// Hands out subscriber ids. Owned by a hub, never shared process-wide.
#[derive(Debug, Default)]
pub struct SubscriberIdGenerator {
    next: AtomicU64,
}

impl SubscriberIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> SubscriberId {
        SubscriberId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

type Senders = HashMap<Address, Vec<(SubscriberId, mpsc::UnboundedSender<AtomObservation>)>>;

/// Registry of live subscribers, keyed by address.
#[derive(Debug, Default)]
pub struct ObservationHub {
    senders: Arc<Mutex<Senders>>,
    ids: SubscriberIdGenerator,
}

impl ObservationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for `address`, replaying `backlog` first.
    ///
    /// Callers must hold the lock that serializes their `publish` calls.
    pub fn subscribe(
        &self,
        address: Address,
        backlog: impl IntoIterator<Item = AtomObservation>,
    ) -> Result<ObservationStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in backlog {
            // The receiver is alive in this scope.
            let _ = tx.send(event);
        }

        let id = self.ids.next_id();
        self.senders
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .entry(address)
            .or_default()
            .push((id, tx));
        debug!(subscriber = id.0, %address, "observation subscriber registered");

        Ok(ObservationStream {
            id,
            address,
            receiver: rx,
            senders: Arc::clone(&self.senders),
        })
    }

    /// Deliver `event` to every live subscriber of `address`.
    pub fn publish(&self, address: &Address, event: &AtomObservation) -> Result<()> {
        let mut senders = self.senders.lock().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(subs) = senders.get_mut(address) {
            subs.retain(|(id, tx)| {
                let alive = tx.send(event.clone()).is_ok();
                if !alive {
                    debug!(subscriber = id.0, "pruning closed observation subscriber");
                }
                alive
            });
            if subs.is_empty() {
                senders.remove(address);
            }
        }
        Ok(())
    }

    /// Number of live subscribers for `address`.
    pub fn subscriber_count(&self, address: &Address) -> usize {
        self.senders
            .lock()
            .map(|s| s.get(address).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

/// An ordered, replayable stream of observations for one address.
///
/// The stream yields every past event followed by every future one until it
/// is cancelled or dropped.
#[derive(Debug)]
pub struct ObservationStream {
    id: SubscriberId,
    address: Address,
    receiver: mpsc::UnboundedReceiver<AtomObservation>,
    senders: Arc<Mutex<Senders>>,
}

impl ObservationStream {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Wait for the next observation.
    ///
    /// Returns `None` once the stream is cancelled and drained.
    pub async fn recv(&mut self) -> Option<AtomObservation> {
        self.receiver.recv().await
    }

    /// Take the next observation if one is already buffered.
    pub fn try_next(&mut self) -> Option<AtomObservation> {
        self.receiver.try_recv().ok()
    }

    /// Take every observation currently buffered.
    pub fn drain(&mut self) -> Vec<AtomObservation> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stop receiving new observations. Already buffered ones stay readable.
    pub fn cancel(&mut self) {
        self.unregister();
        self.receiver.close();
    }

    fn unregister(&self) {
        let Ok(mut senders) = self.senders.lock() else {
            return;
        };
        if let Some(subs) = senders.get_mut(&self.address) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                senders.remove(&self.address);
            }
        }
    }
}

impl Drop for ObservationStream {
    fn drop(&mut self) {
        self.unregister();
        debug!(subscriber = self.id.0, "observation subscriber dropped");
    }
}
