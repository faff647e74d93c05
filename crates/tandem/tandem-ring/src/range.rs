//! Inclusive storage span handed out by `begin_write` / `begin_read`.

use std::fmt;

/// A contiguous region of ring storage, `[start, end]` inclusive.
///
/// Both bounds equal to [`Range::INVALID_INDEX`] means "no region available".
/// The caller creates a fresh `Range` before each begin call; the buffer
/// fills it in and never keeps a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: isize,
    end: isize,
}

impl Range {
    /// Sentinel stored in both bounds of an invalid range.
    pub const INVALID_INDEX: isize = -1;

    /// Returns a range with no region.
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            start: Self::INVALID_INDEX,
            end: Self::INVALID_INDEX,
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, start: isize, end: isize) {
        self.start = start;
        self.end = end;
    }

    #[inline]
    pub(crate) fn invalidate(&mut self) {
        *self = Self::invalid();
    }

    /// First offset of the region, or `INVALID_INDEX`.
    #[inline]
    pub fn start(&self) -> isize {
        self.start
    }

    /// Last offset of the region (inclusive), or `INVALID_INDEX`.
    #[inline]
    pub fn end(&self) -> isize {
        self.end
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start != Self::INVALID_INDEX && self.end != Self::INVALID_INDEX
    }

    /// Number of bytes covered by the region.
    ///
    /// Zero when invalid. A valid range whose `end` precedes its `start`
    /// also reports zero rather than a negative length.
    #[inline]
    pub fn length(&self) -> usize {
        if self.is_valid() {
            (self.end - self.start + 1).max(0) as usize
        } else {
            0
        }
    }

    /// Half-open `start..start + length` span for slicing storage.
    ///
    /// `None` when the range is invalid.
    pub fn span(&self) -> Option<std::ops::Range<usize>> {
        if !self.is_valid() {
            return None;
        }
        let start = self.start as usize;
        Some(start..start + self.length())
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "[{}, {}]", self.start, self.end)
        } else {
            f.write_str("[invalid]")
        }
    }
}
