/// Errors raised by ring buffer operations.
///
/// Every error is reported synchronously to the caller of the violating
/// operation. Nothing is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// An argument was out of its accepted domain (zero capacity, a commit
    /// longer than the granted slice).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The call does not fit the current transaction state of its role.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// A commit would exceed the free space (write) or the valid data (read).
    #[error("overflow: requested {requested} bytes, {available} available")]
    Overflow { requested: usize, available: usize },
}
