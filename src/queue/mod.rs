//! Push-to-pull queues.
//!
//! [`DeliveryQueue`] is the ordered buffer; [`ChannelQueue`] binds one to a
//! pub/sub subscription and owns the unsubscribe protocol; [`QueueWriter`] is
//! the producer half handed to the pub/sub capability.

mod channel;
mod delivery;
mod writer;

use std::sync::{Mutex, MutexGuard};

pub use channel::ChannelQueue;
pub use delivery::DeliveryQueue;
pub use writer::QueueWriter;

/// Acquire mutex guard, ignoring poisoning
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
