// src/queue/channel.rs

//! Subscription-backed queue.
//!
//! A [`ChannelQueue`] binds one topic to one [`DeliveryQueue`] through a
//! [`PubSub`](crate::PubSub) capability. The capability pushes; the owner of
//! the queue pulls.
//!
//! ## Lifecycle
//!
//! ```text
//! Unbound --subscribe()--> Active --unsubscribe() / sentinel / error--> Terminal
//! ```
//!
//! Teardown happens at most once. The capability pointer is held in an
//! `Option` and taken under a short lock; whichever caller takes it performs
//! the external unsubscribe and completes the queue. Every other caller finds
//! `None` and returns `Ok(())`.
//!
//! The teardown completes the queue through a drop guard, so a cancelled
//! `unsubscribe_async()` still leaves the queue terminal.
//!
//! Subscribing is a one-shot transition as well: once a subscribe succeeds,
//! later subscribe calls return `Ok(())` without registering again.
//!
//! The sentinel delivery `(None, None)` completes the queue directly from the
//! handler, which has no access to the capability pointer. The pointer is then
//! released by the next `unsubscribe()` or when the queue is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::Stream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{lock_ignore_poison, DeliveryQueue, QueueWriter};
use crate::runner::{self, MessageConsumer};
use crate::{
    // ---
    log_debug,
    log_info,
    log_warn,
    Error,
    Handler,
    Message,
    PubSubPtr,
    Result,
    SubscribeOptions,
    Topic,
    UnsubscribeOptions,
};

/// Ordered, pull-style view of a pub/sub subscription.
///
/// # Example
///
/// ```
/// # use mom_queue::{ChannelQueue, MemoryPubSub, PubSubPtr, SubscribeOptions, UnsubscribeOptions};
/// # async fn example() -> mom_queue::Result<()> {
/// let hub = MemoryPubSub::new();
/// let pubsub: PubSubPtr = hub.clone();
///
/// let queue = ChannelQueue::new("sensors/temp", pubsub);
/// queue.subscribe_async(SubscribeOptions::default()).await?;
///
/// hub.publish("sensors/temp", "21.5");
/// let message = queue.read().await?;
/// assert_eq!(message.payload_str(), Some("21.5"));
///
/// queue.unsubscribe_async(UnsubscribeOptions::default(), None).await?;
/// # Ok(())
/// # }
/// ```
pub struct ChannelQueue {
    // ---
    topic: Topic,
    queue: Arc<DeliveryQueue>,
    parent: Mutex<Option<PubSubPtr>>,
    subscribed: AtomicBool,
}

/// Completes the queue when dropped, including when the owning future is
/// cancelled part-way through an unsubscribe.
struct CompleteOnDrop<'a> {
    // ---
    queue: &'a DeliveryQueue,
    error: Option<Error>,
}

impl Drop for CompleteOnDrop<'_> {
    fn drop(&mut self) {
        self.queue.complete(self.error.take());
    }
}

impl ChannelQueue {
    // ---
    /// Bind a new queue to `topic` on `pubsub`.
    ///
    /// Nothing is delivered until [`subscribe`](Self::subscribe) or
    /// [`subscribe_async`](Self::subscribe_async) succeeds.
    pub fn new(topic: impl Into<Topic>, pubsub: PubSubPtr) -> Self {
        // ---
        Self {
            topic: topic.into(),
            queue: Arc::new(DeliveryQueue::new()),
            parent: Mutex::new(Some(pubsub)),
            subscribed: AtomicBool::new(false),
        }
    }

    /// Topic this queue is bound to.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Returns `true` if `handler` was created by a `ChannelQueue`.
    ///
    /// Subscription managers use this to tell queue-backed registrations from
    /// plain callbacks. Anything that is not recognisably queue-backed is
    /// reported as `false`.
    pub fn is_one_of(handler: &Handler) -> bool {
        matches!(handler, Handler::Queue(_))
    }

    fn handler(&self) -> Handler {
        Handler::Queue(QueueWriter::new(self.queue.clone(), self.topic.clone()))
    }

    fn live_parent(&self) -> Result<PubSubPtr> {
        lock_ignore_poison(&self.parent)
            .as_ref()
            .cloned()
            .ok_or(Error::Closed)
    }

    fn take_parent(&self) -> Option<PubSubPtr> {
        lock_ignore_poison(&self.parent).take()
    }

    /// Claim the `Unbound -> Active` transition. `false` means an earlier
    /// subscribe already succeeded or is in flight.
    fn claim_subscription(&self) -> bool {
        if self.subscribed.swap(true, Ordering::AcqRel) {
            log_debug!("{}: already subscribed", self.topic);
            return false;
        }
        true
    }

    fn release_subscription_on_error(&self, result: &Result<()>) {
        if result.is_err() {
            self.subscribed.store(false, Ordering::Release);
        }
    }

    /// Register this queue's handler with the pub/sub capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the queue has already been unsubscribed,
    /// otherwise whatever the capability's subscribe reports. A failed
    /// subscribe leaves the queue unbound, so it may be retried. Calling this
    /// on a queue that is already subscribed is a no-op.
    pub fn subscribe(&self, opts: SubscribeOptions) -> Result<()> {
        // ---
        let parent = self.live_parent()?;
        if !self.claim_subscription() {
            return Ok(());
        }

        log_info!("{}: subscribe", self.topic);
        let result = parent.subscribe(&self.topic, self.handler(), opts);
        self.release_subscription_on_error(&result);
        result
    }

    /// Register this queue's handler, waiting for the capability to confirm.
    ///
    /// # Errors
    ///
    /// As [`subscribe`](Self::subscribe).
    pub async fn subscribe_async(&self, opts: SubscribeOptions) -> Result<()> {
        // ---
        let parent = self.live_parent()?;
        if !self.claim_subscription() {
            return Ok(());
        }

        log_info!("{}: subscribe (async)", self.topic);
        let result = parent
            .subscribe_async(&self.topic, self.handler(), opts)
            .await;
        self.release_subscription_on_error(&result);
        result
    }

    /// Deregister the handler and complete the queue.
    ///
    /// Runs at most once per queue. Later or concurrent calls return `Ok(())`
    /// without touching the capability. With `Some(error)`, readers that reach
    /// the end of the buffer fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns the capability's unsubscribe failure. The queue is completed
    /// and the capability released regardless.
    pub fn unsubscribe(&self, opts: UnsubscribeOptions, error: Option<Error>) -> Result<()> {
        // ---
        let Some(parent) = self.take_parent() else {
            return Ok(());
        };

        let _complete = CompleteOnDrop {
            queue: &self.queue,
            error,
        };

        log_info!("{}: unsubscribe", self.topic);
        parent.unsubscribe(&self.topic, &self.handler(), opts)
    }

    /// Deregister the handler and complete the queue, waiting for the
    /// capability's unsubscribe round-trip.
    ///
    /// Shares the at-most-once guarantee with [`unsubscribe`](Self::unsubscribe).
    /// If the returned future is dropped before it finishes, the queue is
    /// still completed with `error`.
    ///
    /// # Errors
    ///
    /// As [`unsubscribe`](Self::unsubscribe).
    pub async fn unsubscribe_async(
        &self,
        opts: UnsubscribeOptions,
        error: Option<Error>,
    ) -> Result<()> {
        // ---
        let Some(parent) = self.take_parent() else {
            return Ok(());
        };

        let _complete = CompleteOnDrop {
            queue: &self.queue,
            error,
        };

        log_info!("{}: unsubscribe (async)", self.topic);
        parent
            .unsubscribe_async(&self.topic, &self.handler(), opts)
            .await
    }

    /// Wait for the next message.
    ///
    /// # Errors
    ///
    /// [`Error::EndOfStream`] after a clean shutdown once the buffer is empty,
    /// or the terminal error the queue was completed with.
    pub async fn read(&self) -> Result<Message> {
        self.queue.read().await
    }

    /// Wait for the next message or until `token` is cancelled.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] if `token` fires first; otherwise as
    /// [`read`](Self::read).
    pub async fn read_cancellable(&self, token: &CancellationToken) -> Result<Message> {
        self.queue.read_cancellable(token).await
    }

    /// Take the next buffered message without waiting.
    pub fn try_read(&self) -> Option<Message> {
        self.queue.try_read()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no messages are buffered.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns `true` once the queue is terminal and fully drained.
    pub fn is_complete(&self) -> bool {
        self.queue.is_complete()
    }

    /// Wait until the queue is terminal and fully drained.
    pub async fn completion(&self) {
        self.queue.completion().await
    }

    /// Drain the queue on a background task, passing each message to
    /// `consumer`.
    ///
    /// Consumer errors are logged and do not stop the loop. The task resolves
    /// to `Ok(())` at end of stream, or to the terminal error.
    pub fn on_message<C>(&self, consumer: C) -> JoinHandle<Result<()>>
    where
        C: MessageConsumer + 'static,
    {
        runner::run(self.queue.clone(), self.topic.clone(), consumer)
    }

    /// Consume the queue as a [`Stream`].
    ///
    /// The stream ends at end of stream. A terminal error is yielded once and
    /// then the stream ends. Dropping the stream drops the queue, which
    /// unsubscribes it.
    pub fn into_stream(self) -> impl Stream<Item = Result<Message>> + Send {
        // ---
        futures_util::stream::unfold(Some(self), |state| async move {
            let queue = state?;
            match queue.read().await {
                Ok(message) => Some((Ok(message), Some(queue))),
                Err(Error::EndOfStream) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

impl Drop for ChannelQueue {
    /// Dropping a queue that was never unsubscribed deregisters its handler
    /// (fire-and-forget) and completes it.
    fn drop(&mut self) {
        // ---
        let parent = match self.parent.get_mut() {
            Ok(parent) => parent.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(parent) = parent {
            let opts = UnsubscribeOptions {
                fire_and_forget: true,
            };
            if let Err(err) = parent.unsubscribe(&self.topic, &self.handler(), opts) {
                log_warn!("{}: unsubscribe on drop failed: {err}", self.topic);
            }
            self.queue.complete(None);
        }
    }
}
