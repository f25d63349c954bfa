use thiserror::Error;

/// Errors surfaced by queues, subscriptions and pub/sub implementations.
///
/// `Error` is `Clone` because a queue completed with an error hands the same
/// value to every reader that finds the buffer empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The queue completed normally and every buffered message was read.
    #[error("end of stream")]
    EndOfStream,

    /// The read was cancelled before a message arrived.
    #[error("read cancelled")]
    Cancelled,

    /// Connection to the broker was lost
    #[error("connection lost")]
    ConnectionLost,

    /// The pub/sub capability rejected a subscribe request
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The pub/sub capability rejected an unsubscribe request
    #[error("unsubscribe failed: {0}")]
    Unsubscribe(String),

    /// Generic transport failure reported by the pub/sub capability
    #[error("transport error: {0}")]
    Transport(String),

    /// A message consumer failed to process a message
    #[error("message handler failed: {0}")]
    Handler(String),

    /// The pub/sub capability has been closed
    #[error("pub/sub closed")]
    Closed,

    /// A required builder field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
}

/// Result type alias for queue and subscription operations
pub type Result<T> = std::result::Result<T, Error>;
