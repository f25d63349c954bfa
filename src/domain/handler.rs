// src/domain/handler.rs

//! Handlers registered with a pub/sub capability.
//!
//! A handler is what the pub/sub subsystem calls when a message arrives. Two
//! kinds exist: handlers owned by a [`ChannelQueue`](crate::ChannelQueue),
//! which only push into that queue, and plain callbacks supplied by user code.
//! The kind is an explicit enum variant, so subscription managers can tell
//! them apart without inspecting closures.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

use super::Topic;
use crate::queue::QueueWriter;

/// Type-erased plain callback.
pub type CallbackFn = dyn Fn(Option<Topic>, Option<Bytes>) + Send + Sync;

/// A message handler registered with a [`PubSub`](crate::PubSub).
///
/// Cloning a handler is cheap and preserves identity: a clone is
/// [`same_as`](Self::same_as) the original.
#[derive(Clone)]
pub enum Handler {
    /// Handler created by a queue; pushes into that queue.
    Queue(QueueWriter),

    /// Plain callback.
    Callback(Arc<CallbackFn>),
}

impl Handler {
    /// Wrap a closure as a plain callback handler.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Option<Topic>, Option<Bytes>) + Send + Sync + 'static,
    {
        Handler::Callback(Arc::new(f))
    }

    /// Invoke the handler for one delivery.
    ///
    /// Never blocks. `(None, None)` is the shutdown sentinel.
    pub fn deliver(&self, topic: Option<Topic>, payload: Option<Bytes>) {
        // ---
        match self {
            Handler::Queue(writer) => writer.write(topic, payload),
            Handler::Callback(f) => f(topic, payload),
        }
    }

    /// Returns `true` if both handlers refer to the same registration target.
    pub fn same_as(&self, other: &Handler) -> bool {
        // ---
        match (self, other) {
            (Handler::Queue(a), Handler::Queue(b)) => a.same_as(b),
            (Handler::Callback(a), Handler::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Queue(writer) => f.debug_tuple("Queue").field(writer.subscription()).finish(),
            Handler::Callback(_) => f.write_str("Callback"),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callback_identity() {
        // ---
        let a = Handler::callback(|_, _| {});
        let b = Handler::callback(|_, _| {});

        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_callback_receives_delivery() {
        // ---
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let handler = Handler::callback(move |topic, payload| {
            assert_eq!(topic, Some(Topic::from("news")));
            assert_eq!(payload, Some(Bytes::from_static(b"hi")));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handler.deliver(Some("news".into()), Some(Bytes::from_static(b"hi")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
