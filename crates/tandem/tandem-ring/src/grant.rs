//! Borrowed-slice wrappers around the begin/end protocol.
//!
//! A grant owns its role's transaction for as long as it lives. It derefs to
//! exactly the granted span of storage, so the slice cannot outlive the
//! transaction, and dropping an uncommitted grant finishes the transaction
//! with zero bytes.
//!
//! ```
//! use tandem_ring::RingBuffer;
//!
//! let ring = RingBuffer::new(16).unwrap();
//!
//! let mut w = ring.grant_write(5).unwrap();
//! w.copy_from_slice(b"hello");
//! w.commit(5).unwrap();
//!
//! let r = ring.grant_read(16).unwrap();
//! assert_eq!(&r[..], b"hello");
//! r.commit(5).unwrap();
//! assert!(ring.is_empty());
//! ```

use crate::error::RingError;
use crate::range::Range;
use crate::ring::{Holder, RingBuffer};
use std::ops::{Deref, DerefMut};
use tracing::warn;

impl RingBuffer {
    /// Opens a write transaction and borrows the writable span.
    ///
    /// The slice is empty when no contiguous free space is available.
    ///
    /// # Errors
    /// `IllegalState` when a write transaction is already open.
    pub fn grant_write(&self, max_length: usize) -> Result<WriteGrant<'_>, RingError> {
        let mut range = Range::invalid();
        self.open_write(max_length, &mut range, Holder::Grant)?;
        Ok(WriteGrant {
            ring: self,
            range,
            done: false,
        })
    }

    /// Opens a read transaction and borrows the readable span.
    ///
    /// The slice is empty when no data is queued.
    ///
    /// # Errors
    /// `IllegalState` when a read transaction is already open.
    pub fn grant_read(&self, max_length: usize) -> Result<ReadGrant<'_>, RingError> {
        let mut range = Range::invalid();
        self.open_read(max_length, &mut range, Holder::Grant)?;
        Ok(ReadGrant {
            ring: self,
            range,
            done: false,
        })
    }
}

/// Open write transaction; derefs to the writable span.
#[derive(Debug)]
pub struct WriteGrant<'a> {
    ring: &'a RingBuffer,
    range: Range,
    done: bool,
}

impl WriteGrant<'_> {
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn len(&self) -> usize {
        self.range.length()
    }

    pub fn is_empty(&self) -> bool {
        self.range.length() == 0
    }

    /// Publishes the first `written` bytes of the span to the reader.
    ///
    /// The transaction is closed whatever the outcome.
    ///
    /// # Errors
    /// `InvalidArgument` when `written` exceeds the granted length; nothing
    /// is published in that case.
    pub fn commit(mut self, written: usize) -> Result<(), RingError> {
        self.done = true;
        if written > self.len() {
            self.ring.close_write(0, Holder::Grant)?;
            return Err(RingError::InvalidArgument(
                "written exceeds the granted length",
            ));
        }
        self.ring.close_write(written, Holder::Grant)
    }
}

impl Deref for WriteGrant<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: this grant owns the write transaction that produced `range`.
        unsafe { self.ring.span(&self.range) }
    }
}

impl DerefMut for WriteGrant<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` makes this the only live borrow.
        unsafe { self.ring.span_mut(&self.range) }
    }
}

impl Drop for WriteGrant<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if !self.is_empty() {
            warn!(range = %self.range, "write grant dropped without commit");
        }
        let _ = self.ring.close_write(0, Holder::Grant);
    }
}

/// Open read transaction; derefs to the readable span.
#[derive(Debug)]
pub struct ReadGrant<'a> {
    ring: &'a RingBuffer,
    range: Range,
    done: bool,
}

impl ReadGrant<'_> {
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn len(&self) -> usize {
        self.range.length()
    }

    pub fn is_empty(&self) -> bool {
        self.range.length() == 0
    }

    /// Releases the first `read` bytes of the span back to the writer.
    ///
    /// # Errors
    /// `InvalidArgument` when `read` exceeds the granted length.
    pub fn commit(mut self, read: usize) -> Result<(), RingError> {
        self.done = true;
        if read > self.len() {
            self.ring.close_read(0, Holder::Grant)?;
            return Err(RingError::InvalidArgument("read exceeds the granted length"));
        }
        self.ring.close_read(read, Holder::Grant)
    }
}

impl Deref for ReadGrant<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: this grant owns the read transaction that produced `range`.
        unsafe { self.ring.span(&self.range) }
    }
}

impl Drop for ReadGrant<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if !self.is_empty() {
            warn!(range = %self.range, "read grant dropped without commit");
        }
        let _ = self.ring.close_read(0, Holder::Grant);
    }
}
