// src/queue/writer.rs

use bytes::Bytes;
use std::sync::Arc;

use super::DeliveryQueue;
use crate::{log_debug, Message, Topic};

/// Producer side of a queue, as registered with a pub/sub capability.
///
/// Holds only the delivery buffer and the subscription topic, never the
/// owning [`ChannelQueue`](crate::ChannelQueue), so a pub/sub registry that
/// keeps the writer alive does not keep the subscription state alive.
#[derive(Clone)]
pub struct QueueWriter {
    // ---
    queue: Arc<DeliveryQueue>,
    subscription: Topic,
}

impl QueueWriter {
    pub(crate) fn new(queue: Arc<DeliveryQueue>, subscription: Topic) -> Self {
        Self {
            queue,
            subscription,
        }
    }

    /// Topic of the subscription this writer feeds.
    pub fn subscription(&self) -> &Topic {
        &self.subscription
    }

    /// Translate one delivery into a queue operation.
    ///
    /// `(None, None)` completes the queue without an error. Anything else is
    /// pushed as a [`Message`]; a missing topic falls back to the
    /// subscription topic and a missing payload to an empty one.
    pub(crate) fn write(&self, topic: Option<Topic>, payload: Option<Bytes>) {
        // ---
        if topic.is_none() && payload.is_none() {
            log_debug!("{}: shutdown sentinel received", self.subscription);
            self.queue.complete(None);
            return;
        }

        let topic = topic.unwrap_or_else(|| self.subscription.clone());
        let message = Message::new(self.subscription.clone(), topic, payload.unwrap_or_default());

        if !self.queue.push(message) {
            log_debug!("{}: dropped delivery after completion", self.subscription);
        }
    }

    pub(crate) fn same_as(&self, other: &QueueWriter) -> bool {
        Arc::ptr_eq(&self.queue, &other.queue)
    }
}
