// src/pubsub/memory.rs

//! In-memory pub/sub implementation.
//!
//! This file contains a pure in-process implementation of the domain-level
//! [`PubSub`] trait. It is intended for testing, local execution, and as a
//! reference for pub/sub semantics.
//!
//! ## Reference Semantics
//!
//! - Once `subscribe()` returns successfully, messages published *after* that
//!   point on the same topic are delivered.
//! - Topics match by exact string equality; there is no pattern matching.
//! - Handlers run synchronously on the publishing thread, in registration
//!   order, and outside the registry lock, so a handler may itself
//!   (un)subscribe.
//! - `close()` force-completes every outstanding subscription by delivering
//!   the `(None, None)` sentinel, then rejects further subscriptions.
//!
//! ## Non-Goals
//!
//! Persistence, network behaviour, failure simulation, and exact emulation of
//! any broker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use crate::{
    // ---
    log_debug,
    Error,
    Handler,
    PubSub,
    Result,
    SubscribeOptions,
    Topic,
    UnsubscribeOptions,
};

/// In-process message hub.
///
/// Simulates a broker within a single process: every handler subscribed to a
/// topic receives every message published on it.
///
/// # Example
///
/// ```
/// # use mom_queue::{MemoryPubSub, QueueBuilder};
/// # async fn example() -> mom_queue::Result<()> {
/// let hub = MemoryPubSub::new();
/// let queue = QueueBuilder::new(hub.clone()).topic("jobs").build_async().await?;
///
/// assert_eq!(hub.publish("jobs", "build"), 1);
/// assert_eq!(queue.read().await?.payload_str(), Some("build"));
/// # Ok(())
/// # }
/// ```
pub struct MemoryPubSub {
    // ---
    subscriptions: RwLock<HashMap<Topic, Vec<Handler>>>,
    closed: AtomicBool,
}

impl MemoryPubSub {
    /// Create a new, empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver `payload` to every handler subscribed to `topic`.
    ///
    /// Returns the number of handlers the message was delivered to.
    pub fn publish(&self, topic: impl Into<Topic>, payload: impl Into<Bytes>) -> usize {
        // ---
        let topic = topic.into();
        let payload = payload.into();

        let handlers = self.handlers_for(&topic);
        log_debug!("publish to {topic}: {} receiver(s)", handlers.len());

        for handler in &handlers {
            handler.deliver(Some(topic.clone()), Some(payload.clone()));
        }

        handlers.len()
    }

    /// Number of handlers currently subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Returns `true` after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Force-complete all outstanding subscriptions.
    ///
    /// Every registered handler receives the `(None, None)` sentinel and the
    /// registry is cleared. Later subscribe calls fail with [`Error::Closed`].
    pub fn close(&self) {
        // ---
        // The flag flips under the registry lock so no `add` can slip a
        // handler in after the drain.
        let drained: Vec<Handler> = {
            let mut subs = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
            subs.drain().flat_map(|(_, handlers)| handlers).collect()
        };

        log_debug!("closing hub, completing {} subscription(s)", drained.len());

        for handler in drained {
            handler.deliver(None, None);
        }
    }

    fn handlers_for(&self, topic: &Topic) -> Vec<Handler> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    fn add(&self, topic: &Topic, handler: Handler) -> Result<()> {
        // ---
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(Error::Closed);
        }

        log_debug!("subscribe to {topic}");
        subs.entry(topic.clone()).or_default().push(handler);
        Ok(())
    }

    fn remove(&self, topic: &Topic, handler: &Handler) {
        // ---
        log_debug!("unsubscribe from {topic}");
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(handlers) = subs.get_mut(topic) {
            handlers.retain(|h| !h.same_as(handler));
            if handlers.is_empty() {
                subs.remove(topic);
            }
        }
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        // ---
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl PubSub for MemoryPubSub {
    // ---
    fn subscribe(&self, topic: &Topic, handler: Handler, _opts: SubscribeOptions) -> Result<()> {
        self.add(topic, handler)
    }

    /// Registration is immediate; there is no broker round-trip to await.
    async fn subscribe_async(
        &self,
        topic: &Topic,
        handler: Handler,
        _opts: SubscribeOptions,
    ) -> Result<()> {
        self.add(topic, handler)
    }

    /// Removing a handler that is not registered is not an error.
    fn unsubscribe(
        &self,
        topic: &Topic,
        handler: &Handler,
        _opts: UnsubscribeOptions,
    ) -> Result<()> {
        self.remove(topic, handler);
        Ok(())
    }

    async fn unsubscribe_async(
        &self,
        topic: &Topic,
        handler: &Handler,
        _opts: UnsubscribeOptions,
    ) -> Result<()> {
        self.remove(topic, handler);
        Ok(())
    }
}
