//! Zero-copy circular byte buffer for one producer and one consumer.
//!
//! The producer asks for a contiguous span of free storage, fills it through
//! whatever channel it owns (a socket read, a file read, a memcpy), then
//! commits the number of bytes that actually landed. The consumer does the
//! mirror image over valid data. At most one write and one read transaction
//! are open at a time; the two may overlap.
//!
//! Two entry points expose the same protocol:
//! - `begin_write` / `end_write` / `begin_read` / `end_read` report offsets
//!   in a [`Range`]; bytes are moved through [`RingBuffer::raw_storage`].
//! - [`RingBuffer::grant_write`] / [`RingBuffer::grant_read`] return guards
//!   that deref to the granted slice and close the transaction on commit or
//!   drop.
//!
//! The window arithmetic assumes the ring's own cursor invariants and is
//! not exported; only the [`WriteBound`] policy is.
//!
//! ```compile_fail
//! use tandem_ring::write_window;
//! ```

mod bound;
mod error;
mod grant;
mod range;
mod ring;

pub use bound::WriteBound;
pub use error::RingError;
pub use grant::{ReadGrant, WriteGrant};
pub use range::Range;
pub use ring::RingBuffer;
