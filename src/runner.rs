//! Queue consumer loop.
//!
//! This module drives a [`DeliveryQueue`] on a background task and hands each
//! message to user-defined logic. It is the machinery behind
//! [`ChannelQueue::on_message`](crate::ChannelQueue::on_message).
//!
//! ## Receive loop
//!
//! The loop awaits the next message and yields while the queue is empty; it
//! does not spin. It exits when the queue reports end of stream or a terminal
//! error.
//!
//! ## Error handling
//!
//! Errors returned by [`MessageConsumer::handle_message`] are best-effort
//! failures: they are logged (when logging is enabled) and processing
//! continues with the next message. A failing message must not bring down the
//! consumer.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::queue::DeliveryQueue;
use crate::{log_debug, log_error, log_warn, Error, Message, Result, Topic};

/// A consumer of queued messages.
///
/// Implemented for any `Fn(Message) -> impl Future<Output = Result<()>>`, so a
/// closure can be passed directly to
/// [`on_message`](crate::ChannelQueue::on_message).
#[async_trait::async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Handle a single message.
    ///
    /// Returning an error does not terminate the loop.
    async fn handle_message(&self, message: Message) -> Result<()>;
}

#[async_trait::async_trait]
impl<F, Fut> MessageConsumer for F
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle_message(&self, message: Message) -> Result<()> {
        (self)(message).await
    }
}

/// Spawn the receive loop for `queue`.
///
/// The returned handle resolves to `Ok(())` at end of stream, or to the error
/// the queue was completed with. Dropping the handle does not stop the loop.
pub(crate) fn run<C>(queue: Arc<DeliveryQueue>, topic: Topic, consumer: C) -> JoinHandle<Result<()>>
where
    C: MessageConsumer + 'static,
{
    tokio::spawn(async move {
        // ---
        loop {
            match queue.read().await {
                Ok(message) => {
                    if let Err(err) = consumer.handle_message(message).await {
                        log_warn!("{topic}: message handler error: {err}");
                    }
                }
                Err(Error::EndOfStream) => {
                    log_debug!("{topic}: queue completed, consumer loop exiting");
                    return Ok(());
                }
                Err(err) => {
                    log_error!("{topic}: queue failed, consumer loop exiting: {err}");
                    return Err(err);
                }
            }
        }
    })
}
