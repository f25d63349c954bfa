// src/queue/delivery.rs

//! Unbounded, ordered delivery buffer.
//!
//! The buffer sits between a producer that must never wait (a pub/sub
//! handler) and one or more consumers that suspend until a message arrives.
//!
//! ## Completion
//!
//! A queue is completed at most once, optionally with an error. Completion
//! stops further pushes but never discards what is already buffered: readers
//! drain remaining messages first and only then observe the end of the stream
//! (or the terminal error).
//!
//! ## Wakeups
//!
//! Readers register interest with [`Notify`] while holding the state lock and
//! only then release it, so a push or completion that lands between the empty
//! check and the await is never missed. Every state change that a waiter could
//! care about wakes all waiters; each one re-checks the state.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::lock_ignore_poison;
use crate::{log_warn, Error, Message, Result};

struct State {
    // ---
    buffer: VecDeque<Message>,

    /// `Some(EndOfStream)` after normal completion, `Some(err)` after
    /// completion with an error.
    end: Option<Error>,
}

impl State {
    fn is_drained(&self) -> bool {
        self.end.is_some() && self.buffer.is_empty()
    }
}

/// Ordered, unbounded message buffer with a one-shot terminal state.
///
/// Each message is handed to exactly one reader. Several readers may wait
/// concurrently; they compete for messages.
pub struct DeliveryQueue {
    // ---
    state: Mutex<State>,
    notify: Notify,
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryQueue {
    /// Create an empty, live queue.
    pub fn new() -> Self {
        // ---
        Self {
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                end: None,
            }),
            notify: Notify::new(),
        }
    }

    /// Append a message.
    ///
    /// Never waits. Returns `false` and drops the message if the queue has
    /// already been completed.
    pub fn push(&self, message: Message) -> bool {
        // ---
        {
            let mut state = lock_ignore_poison(&self.state);
            if state.end.is_some() {
                return false;
            }
            state.buffer.push_back(message);
        }
        self.notify.notify_waiters();
        true
    }

    /// Mark the queue terminal.
    ///
    /// With `Some(err)`, readers that find the buffer empty fail with `err`
    /// instead of [`Error::EndOfStream`]. Only the first call has any effect;
    /// it returns `true`, later calls return `false`.
    pub fn complete(&self, error: Option<Error>) -> bool {
        // ---
        {
            let mut state = lock_ignore_poison(&self.state);
            if state.end.is_some() {
                return false;
            }
            if let Some(err) = &error {
                log_warn!("delivery queue completed with error: {err}");
            }
            state.end = Some(error.unwrap_or(Error::EndOfStream));
        }
        self.notify.notify_waiters();
        true
    }

    /// Take the next buffered message without waiting.
    pub fn try_read(&self) -> Option<Message> {
        // ---
        let mut state = lock_ignore_poison(&self.state);
        let message = state.buffer.pop_front();

        if message.is_some() && state.is_drained() {
            // Wake anyone waiting in `completion()`.
            self.notify.notify_waiters();
        }
        message
    }

    /// Wait for the next message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] once the queue is complete and empty, or
    /// the terminal error the queue was completed with.
    pub async fn read(&self) -> Result<Message> {
        self.read_cancellable(&CancellationToken::new()).await
    }

    /// Wait for the next message or until `token` is cancelled.
    ///
    /// Cancellation never consumes a message: anything pushed after the
    /// cancellation stays buffered for the next read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `token` fires first (or was already
    /// cancelled), otherwise as [`read`](Self::read).
    pub async fn read_cancellable(&self, token: &CancellationToken) -> Result<Message> {
        // ---
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);

            {
                let mut state = lock_ignore_poison(&self.state);
                if let Some(message) = state.buffer.pop_front() {
                    if state.is_drained() {
                        self.notify.notify_waiters();
                    }
                    return Ok(message);
                }
                if let Some(ref end) = state.end {
                    return Err(end.clone());
                }
                notified.as_mut().enable();
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = token.cancelled() => return Err(Error::Cancelled),
            }
        }
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.state).buffer.len()
    }

    /// Returns `true` if no messages are buffered.
    pub fn is_empty(&self) -> bool {
        lock_ignore_poison(&self.state).buffer.is_empty()
    }

    /// Returns `true` once `complete()` has been called, even if messages
    /// remain buffered.
    pub fn is_closed(&self) -> bool {
        lock_ignore_poison(&self.state).end.is_some()
    }

    /// Returns `true` once the queue is complete and every buffered message
    /// has been read.
    pub fn is_complete(&self) -> bool {
        lock_ignore_poison(&self.state).is_drained()
    }

    /// Wait until [`is_complete`](Self::is_complete) becomes `true`.
    pub async fn completion(&self) {
        // ---
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);

            {
                let state = lock_ignore_poison(&self.state);
                if state.is_drained() {
                    return;
                }
                notified.as_mut().enable();
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn msg(payload: &'static str) -> Message {
        Message::new("t".into(), "t".into(), Bytes::from_static(payload.as_bytes()))
    }

    #[tokio::test]
    async fn test_reads_in_push_order() {
        // ---
        let queue = DeliveryQueue::new();
        for i in 0..100 {
            assert!(queue.push(Message::new(
                "t".into(),
                "t".into(),
                Bytes::from(i.to_string())
            )));
        }

        for i in 0..100 {
            let received = queue.read().await.unwrap();
            assert_eq!(received.payload, Bytes::from(i.to_string()));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_before_end_of_stream() {
        // ---
        let queue = DeliveryQueue::new();
        queue.push(msg("a"));
        queue.push(msg("b"));
        assert!(queue.complete(None));

        assert!(queue.is_closed());
        assert!(!queue.is_complete());
        assert_eq!(queue.read().await.unwrap().payload_str(), Some("a"));
        assert_eq!(queue.read().await.unwrap().payload_str(), Some("b"));
        assert_eq!(queue.read().await, Err(Error::EndOfStream));
        assert!(queue.is_complete());
    }

    #[tokio::test]
    async fn test_terminal_error_repeats() {
        // ---
        let queue = DeliveryQueue::new();
        queue.complete(Some(Error::ConnectionLost));

        assert_eq!(queue.read().await, Err(Error::ConnectionLost));
        assert_eq!(queue.read().await, Err(Error::ConnectionLost));
    }

    #[tokio::test]
    async fn test_second_complete_is_ignored() {
        // ---
        let queue = DeliveryQueue::new();
        assert!(queue.complete(None));
        assert!(!queue.complete(Some(Error::ConnectionLost)));

        assert_eq!(queue.read().await, Err(Error::EndOfStream));
    }

    #[tokio::test]
    async fn test_push_after_complete_dropped() {
        // ---
        let queue = DeliveryQueue::new();
        queue.complete(None);

        assert!(!queue.push(msg("late")));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.read().await, Err(Error::EndOfStream));
    }

    #[tokio::test]
    async fn test_cancelled_read_keeps_later_message() {
        // ---
        let queue = DeliveryQueue::new();
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        assert_eq!(queue.read_cancellable(&token).await, Err(Error::Cancelled));

        queue.push(msg("after"));
        assert_eq!(queue.read().await.unwrap().payload_str(), Some("after"));
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        // ---
        let queue = DeliveryQueue::new();
        queue.push(msg("kept"));

        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(queue.read_cancellable(&token).await, Err(Error::Cancelled));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_waiting_reader_wakes_on_push() {
        // ---
        let queue = Arc::new(DeliveryQueue::new());

        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.read().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(msg("wake"));

        let received = timeout(Duration::from_millis(500), reader)
            .await
            .expect("reader did not wake")
            .unwrap()
            .unwrap();
        assert_eq!(received.payload_str(), Some("wake"));
    }

    #[tokio::test]
    async fn test_waiting_reader_wakes_on_complete() {
        // ---
        let queue = Arc::new(DeliveryQueue::new());

        let reader = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.read().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.complete(Some(Error::Transport("gone".into())));

        let result = timeout(Duration::from_millis(500), reader)
            .await
            .expect("reader did not wake")
            .unwrap();
        assert_eq!(result, Err(Error::Transport("gone".into())));
    }

    #[tokio::test]
    async fn test_completion_waits_for_drain() {
        // ---
        let queue = Arc::new(DeliveryQueue::new());
        queue.push(msg("a"));
        queue.complete(None);

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.completion().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        assert!(queue.try_read().is_some());
        timeout(Duration::from_millis(500), waiter)
            .await
            .expect("completion did not resolve")
            .unwrap();
    }

    #[test]
    fn test_try_read_empty() {
        // ---
        let queue = DeliveryQueue::new();
        assert!(queue.try_read().is_none());
    }
}
