// src/domain/pubsub.rs

//! Pub/sub domain abstractions.
//!
//! This module defines the narrow capability a queue needs from an external
//! pub/sub subsystem, plus the value types exchanged across that boundary. It
//! intentionally avoids any reference to concrete protocols, brokers, or
//! client libraries.
//!
//! The pub/sub capability is responsible only for registering handlers and
//! invoking them when a message arrives. Buffering, ordering, and shutdown
//! semantics are handled by [`ChannelQueue`](crate::ChannelQueue).
//!
//! Concrete implementations of this interface live under `src/pubsub/`.
use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::Handler;

/// A pub/sub topic.
///
/// A `Topic` names the channel a consumer subscribes to and the channel a
/// message was delivered on. Its interpretation (literal name, pattern) is up
/// to the pub/sub implementation; the domain layer treats it as opaque.
///
/// Topics are immutable, cheap to clone, and safe to share across threads.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Topic(pub Arc<str>);

impl Topic {
    /// Borrow the topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for Topic
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Topic(value.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivered notification.
///
/// Messages are created by a queue's handler when the pub/sub subsystem
/// delivers a `(topic, payload)` pair, and are handed to exactly one reader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    // ---
    /// Topic of the queue that received this message.
    ///
    /// Differs from [`topic`](Self::topic) when the subscription matched the
    /// delivered topic through a pattern.
    pub subscription: Topic,

    /// Topic the message was published on.
    pub topic: Topic,

    /// Opaque payload bytes. An absent payload is delivered as empty.
    pub payload: Bytes,
}

impl Message {
    /// Create a message received through `subscription`.
    pub fn new(subscription: Topic, topic: Topic, payload: Bytes) -> Self {
        // ---
        Self {
            subscription,
            topic,
            payload,
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, String::from_utf8_lossy(&self.payload))
    }
}

/// Options passed through to the pub/sub subscribe call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Do not wait for the broker to confirm the subscription.
    pub fire_and_forget: bool,
}

/// Options passed through to the pub/sub unsubscribe call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnsubscribeOptions {
    /// Do not wait for the broker to confirm the unsubscribe.
    pub fire_and_forget: bool,
}

/// Pub/sub capability consumed by queues.
///
/// A `PubSub` registers [`Handler`]s against topics and invokes them whenever
/// a matching message arrives. Handlers may be invoked from any thread or task
/// owned by the implementation.
///
/// Implementations must ensure that:
/// - Once `subscribe()` returns successfully, messages published *after* that
///   point and matching the topic are delivered to the handler.
/// - A handler registered once is invoked once per matching message, in
///   publish order.
/// - `unsubscribe()` removes the handler identified by
///   [`Handler::same_as`], leaving other handlers for the topic untouched.
/// - Force-closing outstanding subscriptions (e.g. on connection teardown) is
///   signalled by delivering the sentinel `(None, None)` to each handler.
///
/// Each operation exists in a blocking and an `async` form. The blocking forms
/// must not wait on the broker when `fire_and_forget` is set.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show explicit
/// lifetimes and a boxed `Future`. Consumers should treat the methods as normal
/// `async fn`s.
#[async_trait::async_trait]
pub trait PubSub: Send + Sync {
    // ---
    /// Register `handler` for messages on `topic`.
    fn subscribe(&self, topic: &Topic, handler: Handler, opts: SubscribeOptions) -> Result<()>;

    /// Register `handler` for messages on `topic`, waiting for the broker.
    async fn subscribe_async(
        &self,
        topic: &Topic,
        handler: Handler,
        opts: SubscribeOptions,
    ) -> Result<()>;

    /// Remove `handler` from `topic`.
    fn unsubscribe(&self, topic: &Topic, handler: &Handler, opts: UnsubscribeOptions)
        -> Result<()>;

    /// Remove `handler` from `topic`, waiting for the broker.
    async fn unsubscribe_async(
        &self,
        topic: &Topic,
        handler: &Handler,
        opts: UnsubscribeOptions,
    ) -> Result<()>;
}

/// Shared pub/sub pointer.
///
/// `.clone()` only increments a reference count; clones share the same
/// underlying subsystem.
pub type PubSubPtr = Arc<dyn PubSub>;
