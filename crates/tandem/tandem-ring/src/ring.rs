//! Fixed-capacity byte ring with one write and one read transaction in flight.
//!
//! # Locking
//!
//! `index`, `size` and the two role slots live behind a single mutex. Every
//! begin/end/clear/query takes it for a handful of instructions. The byte
//! transfer itself (copying into or out of the granted span) happens with
//! the lock released, so a slow writer never blocks the reader's
//! bookkeeping and vice versa.
//!
//! # Roles
//!
//! A role slot is `None` when idle and `Some(holder)` while a transaction is
//! open. The holder records whether the transaction was opened through the
//! raw `begin_*` calls or through a grant; a raw `end_*` cannot close a
//! grant's transaction, which keeps grant slices from ever aliasing.

use crate::bound::{WriteBound, read_window, write_window};
use crate::error::RingError;
use crate::range::Range;
use parking_lot::Mutex;
use std::fmt;
use std::ptr::NonNull;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Holder {
    Raw,
    Grant,
}

/// Bookkeeping guarded by the state lock.
#[derive(Debug)]
struct Cursor {
    /// Offset of the oldest valid byte.
    index: usize,
    /// Count of valid bytes.
    size: usize,
    writer: Option<Holder>,
    reader: Option<Holder>,
}

/// Single-producer / single-consumer circular byte buffer.
///
/// Callers never hand bytes to the buffer. Instead they ask for a contiguous
/// span of its storage (`begin_write` / `begin_read`), move bytes through it
/// with whatever channel they own, then report how many bytes actually moved
/// (`end_write` / `end_read`).
///
/// The buffer is `Send + Sync`; share it with `&` or `Arc` between the
/// producing and the consuming thread.
pub struct RingBuffer {
    /// Owned allocation of exactly `capacity` bytes, freed on drop.
    storage: NonNull<[u8]>,
    capacity: usize,
    bound: WriteBound,
    state: Mutex<Cursor>,
}

// SAFETY: the storage is a plain heap allocation owned by the buffer. Access
// to it through grants is partitioned by the transaction protocol (writer in
// free space, reader in valid data), and all bookkeeping goes through the
// mutex. Raw-pointer access is `unsafe` for the caller.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Creates a ring of `capacity` zeroed bytes using [`WriteBound::Contiguous`].
    ///
    /// # Errors
    /// `InvalidArgument` when `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        Self::with_write_bound(capacity, WriteBound::default())
    }

    /// Creates a ring selecting the formula for wrapped write windows.
    pub fn with_write_bound(capacity: usize, bound: WriteBound) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::InvalidArgument("capacity must be greater than 0"));
        }

        let storage: Box<[u8]> = vec![0u8; capacity].into_boxed_slice();

        Ok(Self {
            storage: NonNull::from(Box::leak(storage)),
            capacity,
            bound,
            state: Mutex::new(Cursor {
                index: 0,
                size: 0,
                writer: None,
                reader: None,
            }),
        })
    }

    /// Fixed allocation size. Not the number of queued bytes, see [`len`](Self::len).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid bytes currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().size
    }

    /// No bytes queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().size == 0
    }

    /// Zero-capacity check. Construction rejects zero capacity, so this is
    /// always `false`; use [`is_empty`](Self::is_empty) for "no data queued".
    #[inline]
    pub fn is_empty_capacity(&self) -> bool {
        self.capacity == 0
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().size == self.capacity
    }

    /// Offset of the oldest valid byte. Diagnostics only.
    pub fn current_index(&self) -> usize {
        self.state.lock().index
    }

    #[inline]
    pub fn write_bound(&self) -> WriteBound {
        self.bound
    }

    pub fn is_writing(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    pub fn is_reading(&self) -> bool {
        self.state.lock().reader.is_some()
    }

    /// Pointer to the first byte of storage, valid for `capacity()` bytes for
    /// as long as the buffer lives.
    ///
    /// Dereferencing it is the caller's responsibility: only touch the span
    /// of the range most recently granted to your role, and only until the
    /// matching `end_*` call.
    #[inline]
    pub fn raw_storage(&self) -> *mut u8 {
        self.storage.cast::<u8>().as_ptr()
    }

    /// Opens a write transaction and reports the writable span in `range`.
    ///
    /// `range` is set invalid when the buffer is full or `max_length == 0`.
    ///
    /// # Errors
    /// `IllegalState` when a write transaction is already open.
    pub fn begin_write(&self, max_length: usize, range: &mut Range) -> Result<(), RingError> {
        self.open_write(max_length, range, Holder::Raw)
    }

    /// Commits `written` bytes and closes the write transaction.
    ///
    /// The transaction is closed even when the commit is rejected; `size` is
    /// only changed when every check passes.
    ///
    /// # Errors
    /// - `IllegalState` when no write transaction is open, or it belongs to
    ///   a [`WriteGrant`](crate::WriteGrant) (which stays open).
    /// - `Overflow` when `size + written` would exceed the capacity.
    pub fn end_write(&self, written: usize) -> Result<(), RingError> {
        self.close_write(written, Holder::Raw)
    }

    /// Opens a read transaction and reports the readable span in `range`.
    ///
    /// `range` is set invalid when the buffer is empty or `max_length == 0`.
    ///
    /// # Errors
    /// `IllegalState` when a read transaction is already open.
    pub fn begin_read(&self, max_length: usize, range: &mut Range) -> Result<(), RingError> {
        self.open_read(max_length, range, Holder::Raw)
    }

    /// Consumes `read_count` bytes and closes the read transaction.
    ///
    /// # Errors
    /// - `IllegalState` when no read transaction is open, or it belongs to a
    ///   [`ReadGrant`](crate::ReadGrant).
    /// - `Overflow` when `read_count` exceeds the valid data.
    pub fn end_read(&self, read_count: usize) -> Result<(), RingError> {
        self.close_read(read_count, Holder::Raw)
    }

    /// Drops all queued data and rewinds to offset 0.
    ///
    /// # Errors
    /// `IllegalState` while either transaction is open.
    pub fn clear(&self) -> Result<(), RingError> {
        let mut st = self.state.lock();
        if st.writer.is_some() || st.reader.is_some() {
            return Err(RingError::IllegalState(
                "cannot clear while a transaction is open",
            ));
        }
        debug!(dropped = st.size, index = st.index, "ring cleared");
        st.index = 0;
        st.size = 0;
        Ok(())
    }

    pub(crate) fn open_write(
        &self,
        max_length: usize,
        range: &mut Range,
        holder: Holder,
    ) -> Result<(), RingError> {
        let mut st = self.state.lock();
        if st.writer.is_some() {
            return Err(RingError::IllegalState(
                "cannot begin writing until the previous write finished",
            ));
        }
        st.writer = Some(holder);

        match write_window(st.index, st.size, self.capacity, max_length, self.bound) {
            Some((start, end)) => range.set(start, end),
            None => range.invalidate(),
        }
        trace!(max_length, %range, index = st.index, size = st.size, "begin write");
        Ok(())
    }

    pub(crate) fn close_write(&self, written: usize, holder: Holder) -> Result<(), RingError> {
        let mut st = self.state.lock();
        let open = st.writer;
        match open {
            None => {
                return Err(RingError::IllegalState("no write transaction is open"));
            }
            Some(open) if open != holder => {
                return Err(RingError::IllegalState(
                    "write transaction is owned by a grant",
                ));
            }
            Some(_) => st.writer = None,
        }

        let available = self.capacity - st.size;
        if written > available {
            return Err(RingError::Overflow {
                requested: written,
                available,
            });
        }
        st.size += written;
        trace!(written, size = st.size, "end write");
        Ok(())
    }

    pub(crate) fn open_read(
        &self,
        max_length: usize,
        range: &mut Range,
        holder: Holder,
    ) -> Result<(), RingError> {
        let mut st = self.state.lock();
        if st.reader.is_some() {
            return Err(RingError::IllegalState(
                "cannot begin reading until the previous read finished",
            ));
        }
        st.reader = Some(holder);

        match read_window(st.index, st.size, self.capacity, max_length) {
            Some((start, end)) => range.set(start, end),
            None => range.invalidate(),
        }
        trace!(max_length, %range, index = st.index, size = st.size, "begin read");
        Ok(())
    }

    pub(crate) fn close_read(&self, read_count: usize, holder: Holder) -> Result<(), RingError> {
        let mut st = self.state.lock();
        let open = st.reader;
        match open {
            None => {
                return Err(RingError::IllegalState("no read transaction is open"));
            }
            Some(open) if open != holder => {
                return Err(RingError::IllegalState(
                    "read transaction is owned by a grant",
                ));
            }
            Some(_) => st.reader = None,
        }

        if read_count > st.size {
            return Err(RingError::Overflow {
                requested: read_count,
                available: st.size,
            });
        }
        st.size -= read_count;
        st.index = (st.index + read_count) % self.capacity;
        trace!(read_count, size = st.size, index = st.index, "end read");
        Ok(())
    }

    /// Borrows the span of `range` mutably.
    ///
    /// # Safety
    /// The caller must hold the open write transaction that produced `range`
    /// and must not create another reference to the same span.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn span_mut(&self, range: &Range) -> &mut [u8] {
        match range.span() {
            // SAFETY: the window arithmetic keeps every span inside storage.
            Some(span) => unsafe {
                std::slice::from_raw_parts_mut(self.raw_storage().add(span.start), span.len())
            },
            None => &mut [],
        }
    }

    /// Borrows the span of `range`.
    ///
    /// # Safety
    /// The caller must hold the open transaction that produced `range`.
    pub(crate) unsafe fn span(&self, range: &Range) -> &[u8] {
        match range.span() {
            // SAFETY: the window arithmetic keeps every span inside storage.
            Some(span) => unsafe {
                std::slice::from_raw_parts(self.raw_storage().add(span.start), span.len())
            },
            None => &[],
        }
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        // SAFETY: `storage` came from `Box::leak` in the constructor and is
        // released exactly once here.
        unsafe { drop(Box::from_raw(self.storage.as_ptr())) };
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("bound", &self.bound)
            .field("index", &st.index)
            .field("size", &st.size)
            .field("writer", &st.writer)
            .field("reader", &st.reader)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_bytes(ring: &RingBuffer, range: &Range, fill: u8) {
        let span = range.span().expect("valid range");
        unsafe { std::ptr::write_bytes(ring.raw_storage().add(span.start), fill, span.len()) };
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            RingBuffer::new(0),
            Err(RingError::InvalidArgument(_))
        ));
        assert!(matches!(
            RingBuffer::with_write_bound(0, WriteBound::Observed),
            Err(RingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn fresh_ring_queries() {
        let ring = RingBuffer::new(16).unwrap();
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.len(), 0);
        assert!(ring.is_empty());
        assert!(!ring.is_empty_capacity());
        assert!(!ring.is_full());
        assert_eq!(ring.current_index(), 0);
        assert_eq!(ring.write_bound(), WriteBound::Contiguous);
        assert!(!ring.raw_storage().is_null());
    }

    #[test]
    fn eight_byte_walkthrough() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();

        ring.begin_write(5, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (0, 4));
        write_bytes(&ring, &r, 0xAB);
        ring.end_write(5).unwrap();
        assert_eq!(ring.len(), 5);

        let mut r = Range::invalid();
        ring.begin_read(3, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (0, 2));
        ring.end_read(3).unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.current_index(), 3);

        // Write cursor at 5, past the reader: runs to the physical end.
        let mut r = Range::invalid();
        ring.begin_write(8, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (5, 7));
        ring.end_write(3).unwrap();
        assert_eq!(ring.len(), 5);

        // Wrapped: must stop before the unread byte at offset 3.
        let mut r = Range::invalid();
        ring.begin_write(8, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (0, 2));
        assert_eq!(r.length(), 3);
        ring.end_write(0).unwrap();
    }

    #[test]
    fn observed_bound_offers_nothing_once_wrapped() {
        let ring = RingBuffer::with_write_bound(8, WriteBound::Observed).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(5, &mut r).unwrap();
        ring.end_write(5).unwrap();
        ring.begin_read(3, &mut r).unwrap();
        ring.end_read(3).unwrap();
        ring.begin_write(8, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (5, 7));
        ring.end_write(3).unwrap();

        ring.begin_write(8, &mut r).unwrap();
        assert!(!r.is_valid());
        assert_eq!(r.length(), 0);
        ring.end_write(0).unwrap();
    }

    #[test]
    fn second_begin_is_illegal_regardless_of_arguments() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(4, &mut r).unwrap();
        assert!(matches!(
            ring.begin_write(0, &mut r),
            Err(RingError::IllegalState(_))
        ));
        // The read role is independent.
        ring.begin_read(4, &mut r).unwrap();
        assert!(matches!(
            ring.begin_read(1, &mut r),
            Err(RingError::IllegalState(_))
        ));
    }

    #[test]
    fn end_without_begin_is_illegal() {
        let ring = RingBuffer::new(8).unwrap();
        assert!(matches!(ring.end_write(0), Err(RingError::IllegalState(_))));
        assert!(matches!(ring.end_read(0), Err(RingError::IllegalState(_))));
    }

    #[test]
    fn failed_end_write_still_releases_the_role() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(8, &mut r).unwrap();
        assert_eq!(
            ring.end_write(9),
            Err(RingError::Overflow {
                requested: 9,
                available: 8
            })
        );
        assert_eq!(ring.len(), 0);
        assert!(!ring.is_writing());
        ring.begin_write(8, &mut r).unwrap();
    }

    #[test]
    fn failed_end_read_still_releases_the_role() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(4, &mut r).unwrap();
        ring.end_write(4).unwrap();

        ring.begin_read(8, &mut r).unwrap();
        assert_eq!(
            ring.end_read(5),
            Err(RingError::Overflow {
                requested: 5,
                available: 4
            })
        );
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.current_index(), 0);
        ring.begin_read(8, &mut r).unwrap();
        assert_eq!((r.start(), r.end()), (0, 3));
    }

    #[test]
    fn empty_read_and_full_write_are_invalid() {
        let ring = RingBuffer::new(4).unwrap();
        let mut r = Range::invalid();
        ring.begin_read(4, &mut r).unwrap();
        assert!(!r.is_valid());
        assert_eq!(r.length(), 0);
        ring.end_read(0).unwrap();

        ring.begin_write(4, &mut r).unwrap();
        ring.end_write(4).unwrap();
        assert!(ring.is_full());

        ring.begin_write(4, &mut r).unwrap();
        assert!(!r.is_valid());
        ring.end_write(0).unwrap();
    }

    #[test]
    fn zero_max_length_is_invalid_range() {
        let ring = RingBuffer::new(4).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(0, &mut r).unwrap();
        assert!(!r.is_valid());
        ring.end_write(0).unwrap();
    }

    #[test]
    fn end_read_advances_index_modulo_capacity() {
        let ring = RingBuffer::new(5).unwrap();
        let mut r = Range::invalid();
        for (write, read) in [(4usize, 3usize), (1, 2), (4, 3), (2, 3)] {
            ring.begin_write(write, &mut r).unwrap();
            let granted = r.length();
            ring.end_write(granted).unwrap();

            let size_before = ring.len();
            let index_before = ring.current_index();
            ring.begin_read(read, &mut r).unwrap();
            let n = r.length();
            ring.end_read(n).unwrap();
            assert_eq!(ring.len(), size_before - n);
            assert_eq!(ring.current_index(), (index_before + n) % 5);
        }
    }

    #[test]
    fn round_trip_restores_cursor() {
        let ring = RingBuffer::new(32).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(10, &mut r).unwrap();
        ring.end_write(10).unwrap();
        ring.begin_read(10, &mut r).unwrap();
        ring.end_read(10).unwrap();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.current_index(), 10);

        let index = ring.current_index();
        ring.begin_write(7, &mut r).unwrap();
        ring.end_write(7).unwrap();
        ring.begin_read(7, &mut r).unwrap();
        ring.end_read(7).unwrap();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.current_index(), index + 7);
    }

    #[test]
    fn clear_refused_while_open() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(3, &mut r).unwrap();
        ring.end_write(3).unwrap();
        ring.begin_read(1, &mut r).unwrap();
        ring.end_read(1).unwrap();

        ring.begin_read(1, &mut r).unwrap();
        assert!(matches!(ring.clear(), Err(RingError::IllegalState(_))));
        ring.end_read(0).unwrap();

        ring.begin_write(1, &mut r).unwrap();
        assert!(matches!(ring.clear(), Err(RingError::IllegalState(_))));
        ring.end_write(0).unwrap();

        ring.clear().unwrap();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.current_index(), 0);
    }

    #[test]
    fn bytes_written_through_storage_are_read_back() {
        let ring = RingBuffer::new(8).unwrap();
        let mut r = Range::invalid();
        ring.begin_write(3, &mut r).unwrap();
        unsafe {
            std::ptr::copy_nonoverlapping(b"abc".as_ptr(), ring.raw_storage(), 3);
        }
        ring.end_write(3).unwrap();

        ring.begin_read(8, &mut r).unwrap();
        let got = unsafe { ring.span(&r) };
        assert_eq!(got, b"abc");
        ring.end_read(3).unwrap();
    }
}
