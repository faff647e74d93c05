//! Wraparound arithmetic for the writable and readable windows.
//!
//! Both functions are pure: they take a snapshot of the cursor state and
//! return the inclusive `(start, end)` pair a begin call should report, or
//! `None` when no region is available. The caller holds the state lock.
//!
//! # Layout
//!
//! ```text
//! capacity = 8, index = 3, size = 2
//!
//!   0   1   2   3   4   5   6   7
//! [ . | . | . | D | D | . | . | . ]
//!               ^index  ^w = (index + size) % C
//!
//! readable: [3, 4]       writable: [5, 7]  (stops at the physical end)
//! ```
//!
//! Once the writer wraps (`w < index`), the writable window runs from `w`
//! up to, but never onto, the oldest unread byte at `index`.

/// Formula used for the upper bound of a wrapped write window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteBound {
    /// `end = min(w + max_length, index) - 1`.
    ///
    /// Offers every free byte between the write cursor and the reader.
    #[default]
    Contiguous,
    /// `end = min(w, max_length, index) - 1`.
    ///
    /// Three-way minimum without adding `w` and `max_length`. Since the
    /// minimum never exceeds `w`, a wrapped write window under this formula
    /// is always empty (or invalid when `w == 0`): the writer only makes
    /// progress again once the reader has crossed the physical end.
    Observed,
}

/// Computes the writable window.
///
/// Returns `None` when the buffer is full or `max_length == 0`.
///
/// # Examples
///
/// ```text
/// C = 8, index = 3, size = 2, max_length = 8
///   w = 5 >= index            -> end = min(5 + 8, 8) - 1 = 7   => [5, 7]
///
/// C = 8, index = 3, size = 5, max_length = 8
///   w = 0 <  index, Contiguous -> end = min(0 + 8, 3) - 1 = 2  => [0, 2]
///   w = 0 <  index, Observed   -> end = min(0, 8, 3) - 1 = -1  => invalid
/// ```
pub(crate) fn write_window(
    index: usize,
    size: usize,
    capacity: usize,
    max_length: usize,
    bound: WriteBound,
) -> Option<(isize, isize)> {
    if size == capacity || max_length == 0 {
        return None;
    }

    let w = (index + size) % capacity;
    let end = if w < index {
        match bound {
            WriteBound::Contiguous => w.saturating_add(max_length).min(index),
            WriteBound::Observed => w.min(max_length).min(index),
        }
    } else {
        w.saturating_add(max_length).min(capacity)
    };

    Some((w as isize, end as isize - 1))
}

/// Computes the readable window.
///
/// Bounded by the requested length, the valid data and the physical end of
/// storage at once: `end = min(index + max_length, index + size, C) - 1`.
/// Returns `None` when the buffer is empty or `max_length == 0`.
pub(crate) fn read_window(
    index: usize,
    size: usize,
    capacity: usize,
    max_length: usize,
) -> Option<(isize, isize)> {
    if size == 0 || max_length == 0 {
        return None;
    }

    let end = index
        .saturating_add(max_length)
        .min(index + size)
        .min(capacity);

    Some((index as isize, end as isize - 1))
}
