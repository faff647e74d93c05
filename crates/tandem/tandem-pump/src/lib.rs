//! Moves bytes between `std::io` endpoints through a [`RingBuffer`] without
//! staging copies.
//!
//! The producer hands the ring's free span straight to `Read::read`; the
//! consumer hands the valid span straight to `Write::write`. Each side
//! commits exactly what its endpoint reported.
//!
//! [`RingBuffer`]: tandem_ring::RingBuffer

mod consumer;
mod error;
mod pipe;
mod producer;

pub use consumer::Consumer;
pub use error::PumpError;
pub use pipe::{PumpOptions, PumpStats, run_pipe, run_pipe_recorded};
pub use producer::Producer;

/// Outcome of a single producer or consumer transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Bytes committed by this transaction.
    Moved(usize),
    /// No contiguous span was available, or the endpoint was interrupted.
    Stalled,
    /// Source exhausted (producer only).
    Eof,
}
