// SPDX-License-Identifier: MIT

//! Internal event bus (§3 "Internal event bus", §9 "Cyclic references and
//! weak observers").
//!
//! Single-process topic bus. A publish blocks until every subscriber
//! registered on that topic at call time has acknowledged, which is what
//! gives the Cluster-State Tracker its ordering guarantee (§5): a
//! subscriber registered before a refresh starts observes that refresh's
//! events before the refresh returns.
//!
//! Subscriptions are owned tickets: dropping one unregisters it. Because
//! `publish` snapshots the subscriber list before awaiting any sends, a
//! ticket dropped mid-dispatch still receives that one in-flight event —
//! deliver-then-unsubscribe, per the design note's first option.

use crate::event::Event;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};

type Mailbox = mpsc::Sender<(Event, oneshot::Sender<()>)>;

#[derive(Default)]
struct Registry {
    topics: HashMap<String, Vec<(u64, Mailbox)>>,
}

const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// A topic-routed, acknowledgment-gated publish/subscribe bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
    mailbox_capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_mailbox_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    pub fn with_mailbox_capacity(mailbox_capacity: usize) -> Self {
        Self { inner: Arc::new(RwLock::new(Registry::default())), next_id: Arc::new(AtomicU64::new(0)), mailbox_capacity }
    }

    /// Register a subscriber on `topic`. The returned [`SubscriptionTicket`]
    /// must be kept alive for as long as the subscription should last.
    pub fn subscribe(&self, topic: impl Into<String>) -> (SubscriptionTicket, Subscriber) {
        let topic = topic.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        self.inner.write().topics.entry(topic.clone()).or_default().push((id, tx));
        let ticket = SubscriptionTicket { inner: Arc::downgrade(&self.inner), topic, id };
        (ticket, Subscriber { rx })
    }

    /// Publish `event` on its topic and wait for every subscriber
    /// registered at call time to acknowledge it.
    pub async fn publish(&self, event: Event) {
        let topic = event.topic();
        let mailboxes: Vec<Mailbox> = {
            let registry = self.inner.read();
            registry.topics.get(&topic).map(|subs| subs.iter().map(|(_, tx)| tx.clone()).collect()).unwrap_or_default()
        };
        if mailboxes.is_empty() {
            return;
        }

        let mut acks = Vec::with_capacity(mailboxes.len());
        for mailbox in mailboxes {
            let (ack_tx, ack_rx) = oneshot::channel();
            if mailbox.send((event.clone(), ack_tx)).await.is_ok() {
                acks.push(ack_rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// The receiving half of a subscription.
pub struct Subscriber {
    rx: mpsc::Receiver<(Event, oneshot::Sender<()>)>,
}

impl Subscriber {
    /// Receive the next event. The returned [`Ack`] must be acknowledged
    /// (explicitly, or implicitly on drop) before the publisher's
    /// `publish()` call returns.
    pub async fn recv(&mut self) -> Option<(Event, Ack)> {
        self.rx.recv().await.map(|(event, tx)| (event, Ack(Some(tx))))
    }
}

/// Acknowledges receipt of one event when dropped, or explicitly via
/// [`Ack::ack`].
pub struct Ack(Option<oneshot::Sender<()>>);

impl Ack {
    pub fn ack(mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Ack {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Owned subscription handle. Unregisters from the bus when dropped.
pub struct SubscriptionTicket {
    inner: Weak<RwLock<Registry>>,
    topic: String,
    id: u64,
}

impl Drop for SubscriptionTicket {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Some(subs) = inner.write().topics.get_mut(&self.topic) {
                subs.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_immediately() {
        let bus = EventBus::new();
        bus.publish(Event::NodeAdded("n1".into())).await;
    }

    #[tokio::test]
    async fn subscriber_receives_matching_topic_only() {
        let bus = EventBus::new();
        let (_ticket_a, mut sub_a) = bus.subscribe("node-added:n1");
        let (_ticket_b, mut sub_b) = bus.subscribe("node-added:n2");

        bus.publish(Event::NodeAdded("n1".into())).await;

        let (event, ack) = sub_a.recv().await.unwrap();
        assert_eq!(event, Event::NodeAdded("n1".into()));
        ack.ack();

        assert!(sub_b.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_waits_for_acknowledgment() {
        let bus = EventBus::new();
        let (_ticket, mut sub) = bus.subscribe("node-empty:i-abc");

        let bus2 = bus.clone();
        let publisher = tokio::spawn(async move {
            bus2.publish(Event::NodeEmpty("i-abc".into())).await;
        });

        let (_event, ack) = sub.recv().await.unwrap();
        // publisher is still waiting on the ack at this point.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!publisher.is_finished());
        ack.ack();

        publisher.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_ticket_unsubscribes() {
        let bus = EventBus::new();
        let (ticket, mut sub) = bus.subscribe("node-removed:n1");
        drop(ticket);

        bus.publish(Event::NodeRemoved("n1".into())).await;
        assert!(sub.rx.try_recv().is_err());
    }
}
