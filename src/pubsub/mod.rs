//! Pub/sub implementations.
//!
//! Concrete implementations of the domain-level [`PubSub`](crate::PubSub)
//! trait. Broker-backed implementations live outside this crate; the
//! in-memory hub here is the reference for delivery semantics.

mod memory;

pub use memory::MemoryPubSub;
