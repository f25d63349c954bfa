//! Queue builder.
//!
//! Provides a fluent builder API for creating a [`ChannelQueue`] and
//! subscribing it in one step.

use crate::{ChannelQueue, Error, PubSubPtr, Result, SubscribeOptions, Topic};

/// Builder for subscribed [`ChannelQueue`] instances.
///
/// # Examples
///
/// ## Blocking subscribe
/// ```
/// use mom_queue::{MemoryPubSub, QueueBuilder};
///
/// # fn example() -> mom_queue::Result<()> {
/// let hub = MemoryPubSub::new();
/// let queue = QueueBuilder::new(hub.clone())
///     .topic("alerts")
///     .fire_and_forget()
///     .build()?;
///
/// hub.publish("alerts", "disk full");
/// assert_eq!(queue.len(), 1);
/// # Ok(())
/// # }
/// ```
///
/// ## Missing topic
/// ```
/// use mom_queue::{Error, MemoryPubSub, QueueBuilder};
///
/// let err = QueueBuilder::new(MemoryPubSub::new()).build().err();
/// assert_eq!(err, Some(Error::MissingConfig("topic".into())));
/// ```
pub struct QueueBuilder {
    // ---
    pubsub: PubSubPtr,
    topic: Option<Topic>,
    fire_and_forget: bool,
}

impl QueueBuilder {
    /// Create a builder for queues on `pubsub`.
    pub fn new(pubsub: PubSubPtr) -> Self {
        // ---
        Self {
            pubsub,
            topic: None,
            fire_and_forget: false,
        }
    }

    /// Set the topic to subscribe to (required).
    pub fn topic(mut self, topic: impl Into<Topic>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Do not wait for the broker to confirm the subscription.
    ///
    /// Default: wait for confirmation.
    pub fn fire_and_forget(mut self) -> Self {
        self.fire_and_forget = true;
        self
    }

    fn prepare(self) -> Result<(ChannelQueue, SubscribeOptions)> {
        // ---
        let topic = self
            .topic
            .ok_or_else(|| Error::MissingConfig("topic".into()))?;

        let opts = SubscribeOptions {
            fire_and_forget: self.fire_and_forget,
        };

        Ok((ChannelQueue::new(topic, self.pubsub), opts))
    }

    /// Create the queue and subscribe it with the blocking subscribe call.
    ///
    /// # Errors
    ///
    /// [`Error::MissingConfig`] if no topic was set, otherwise the subscribe
    /// failure reported by the pub/sub capability.
    pub fn build(self) -> Result<ChannelQueue> {
        // ---
        let (queue, opts) = self.prepare()?;
        queue.subscribe(opts)?;
        Ok(queue)
    }

    /// Create the queue and subscribe it with the async subscribe call.
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build).
    pub async fn build_async(self) -> Result<ChannelQueue> {
        // ---
        let (queue, opts) = self.prepare()?;
        queue.subscribe_async(opts).await?;
        Ok(queue)
    }
}
