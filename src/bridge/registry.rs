//! Fan-out of chat messages to the relays listening on a destination.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::common::Destination;

struct Subscriber {
    destination: Destination,
    sender: mpsc::UnboundedSender<String>,
}

/// Relays subscribed to chat destinations, keyed by server name.
///
/// Several servers may share one destination; a chat message posted there
/// goes to all of them. Subscribing under an existing name replaces the
/// previous entry.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages for `destination` into `sender` under `id`.
    ///
    /// Returns `true` if an earlier subscription under `id` was replaced.
    pub async fn subscribe(
        &self,
        id: impl Into<String>,
        destination: Destination,
        sender: mpsc::UnboundedSender<String>,
    ) -> bool {
        let id = id.into();
        debug!(server = %id, destination, "Subscribing relay");
        self.subscribers
            .write()
            .await
            .insert(
                id,
                Subscriber {
                    destination,
                    sender,
                },
            )
            .is_some()
    }

    /// Returns `true` if `id` was subscribed.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let removed = self.subscribers.write().await.remove(id).is_some();
        if removed {
            debug!(server = %id, "Unsubscribed relay");
        }
        removed
    }

    /// Hand `text` to every relay subscribed to `destination`.
    ///
    /// Returns how many relays accepted it.
    pub async fn dispatch(&self, destination: Destination, text: &str) -> usize {
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;
        for (id, subscriber) in subscribers.iter() {
            if subscriber.destination != destination {
                continue;
            }
            match subscriber.sender.send(text.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(server = %id, "Relay inbound queue closed, dropping message"),
            }
        }
        delivered
    }

    /// Names of the servers subscribed to `destination`, sorted.
    pub async fn subscribers(&self, destination: Destination) -> Vec<String> {
        let mut names: Vec<String> = self
            .subscribers
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.destination == destination)
            .map(|(id, _)| id.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_reaches_only_matching_destination() {
        let registry = SubscriberRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        registry.subscribe("a", 1, tx_a).await;
        registry.subscribe("b", 1, tx_b).await;
        registry.subscribe("c", 2, tx_c).await;

        assert_eq!(registry.dispatch(1, "Alice: hi").await, 2);

        assert_eq!(rx_a.try_recv().unwrap(), "Alice: hi");
        assert_eq!(rx_b.try_recv().unwrap(), "Alice: hi");
        assert!(rx_c.try_recv().is_err());
        assert_eq!(registry.subscribers(1).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_subscribe_replaces_by_name() {
        let registry = SubscriberRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        assert!(!registry.subscribe("srv", 1, old_tx).await);
        assert!(registry.subscribe("srv", 1, new_tx).await);
        registry.dispatch(1, "hello").await;

        assert!(old_rx.try_recv().is_err());
        assert_eq!(new_rx.try_recv().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.subscribe("srv", 7, tx).await;

        assert!(registry.unsubscribe("srv").await);
        assert!(!registry.unsubscribe("srv").await);
        assert_eq!(registry.dispatch(7, "nobody home").await, 0);
        assert!(registry.subscribers(7).await.is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_is_not_counted() {
        let registry = SubscriberRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.subscribe("srv", 1, tx).await;
        drop(rx);

        assert_eq!(registry.dispatch(1, "hi").await, 0);
    }
}
