//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! pub/sub implementations, protocols, or infrastructure concerns.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod handler;
mod pubsub;

// --- Pub/sub domain re-exports ---

pub use handler::{CallbackFn, Handler};
pub use pubsub::{
    //
    Message,
    PubSub,
    PubSubPtr,
    SubscribeOptions,
    Topic,
    UnsubscribeOptions,
};
