//! Ordered, pull-style queues over push-style pub/sub subscriptions
//!
//! A pub/sub subsystem delivers messages by calling a handler on its own
//! thread. This library turns those calls into a [`ChannelQueue`] that a
//! consumer reads at its own pace, in arrival order, without blocking the
//! delivery thread and without losing messages on shutdown.
//!
//! - [`DeliveryQueue`]: unbounded FIFO buffer with a one-shot terminal state.
//! - [`ChannelQueue`]: binds a topic to a queue through a [`PubSub`]
//!   capability and owns the at-most-once unsubscribe protocol.
//! - [`MemoryPubSub`]: in-process reference implementation of [`PubSub`].
//!

// Import all sub modules once...
mod domain;
mod pubsub;
mod queue;
mod runner;

mod queue_builder;

mod error;
mod macros;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use queue::{ChannelQueue, DeliveryQueue, QueueWriter};
pub use queue_builder::QueueBuilder;
pub use runner::MessageConsumer;

pub use pubsub::MemoryPubSub;

pub use error::{Error, Result};

// --- public re-exports
pub use domain::{
    //
    CallbackFn,
    Handler,
    Message,
    PubSub,
    PubSubPtr,
    SubscribeOptions,
    Topic,
    UnsubscribeOptions,
};
