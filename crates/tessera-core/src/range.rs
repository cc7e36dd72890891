//! Byte range arithmetic over chunked payloads.
//!
//! Everything here is pure: mapping an inclusive byte range onto the chunks
//! that hold it, moving a cursor for a seek, and normalizing Python-style
//! slices and indices against a payload length.

use std::io::SeekFrom;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::ValidationError;

/// The part of one chunk covered by a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSlice {
    /// Chunk ordinal within the record.
    pub chunk: usize,
    /// Byte range relative to the start of that chunk.
    pub range: Range<usize>,
}

/// Resolve the inclusive byte range `[start, stop]` to the ordered chunk
/// slices that contain it.
///
/// The first chunk contributes from `start` to its end, chunks strictly in
/// between contribute whole, and the last contributes up to and including
/// `stop`. When both ends fall in one chunk the result is a single slice.
/// Returns nothing when `start > stop`.
pub fn resolve_range(start: u64, stop: u64, chunk_size: usize) -> Vec<ChunkSlice> {
    if start > stop {
        return Vec::new();
    }
    let size = chunk_size.max(1) as u64;
    let (chunk_a, sub_a) = ((start / size) as usize, (start % size) as usize);
    let (chunk_b, sub_b) = ((stop / size) as usize, (stop % size) as usize);

    if chunk_a == chunk_b {
        return vec![ChunkSlice {
            chunk: chunk_a,
            range: sub_a..sub_b + 1,
        }];
    }

    let full = size as usize;
    let mut slices = Vec::with_capacity(chunk_b - chunk_a + 1);
    slices.push(ChunkSlice {
        chunk: chunk_a,
        range: sub_a..full,
    });
    slices.extend((chunk_a + 1..chunk_b).map(|chunk| ChunkSlice {
        chunk,
        range: 0..full,
    }));
    slices.push(ChunkSlice {
        chunk: chunk_b,
        range: 0..sub_b + 1,
    });
    slices
}

/// Compute the cursor position after a seek.
///
/// `SeekFrom::End` only accepts offsets `<= 0`; the end is one past the last
/// byte. A result outside `[0, len]` is rejected.
pub fn update_position(current: u64, pos: SeekFrom, len: u64) -> Result<u64, ValidationError> {
    let target: i128 = match pos {
        SeekFrom::Start(offset) => offset as i128,
        SeekFrom::Current(offset) => current as i128 + offset as i128,
        SeekFrom::End(offset) => {
            if offset > 0 {
                return Err(ValidationError::InvalidSeekOffset {
                    origin: "end",
                    offset,
                });
            }
            len as i128 + offset as i128
        }
    };
    if target < 0 || target > len as i128 {
        return Err(ValidationError::PositionOutOfRange {
            position: target,
            len,
        });
    }
    Ok(target as u64)
}

/// Normalize a single index, negative counting from the end.
///
/// Returns `None` when the index lands outside `[0, len)`.
pub fn byte_index(index: i64, len: u64) -> Option<u64> {
    let len = len as i128;
    let index = index as i128;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as u64)
}

/// A slice over a payload with optional bounds.
///
/// Bounds follow Python slice rules: negative values count from the end, and
/// out-of-range values clamp. A stop at or before the start selects nothing.
/// Only a step of 1 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSlice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: i64,
}

impl Default for ByteSlice {
    fn default() -> Self {
        Self {
            start: None,
            stop: None,
            step: 1,
        }
    }
}

impl ByteSlice {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: 1,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Resolve to a concrete half-open range within `[0, len]`.
    pub fn indices(&self, len: u64) -> Result<Range<u64>, ValidationError> {
        if self.step != 1 {
            return Err(ValidationError::NonUnitStep(self.step));
        }
        let n = len as i128;
        let clamp = |bound: Option<i64>, default: i128| -> i128 {
            match bound {
                None => default,
                Some(b) => {
                    let b = b as i128;
                    let b = if b < 0 { b + n } else { b };
                    b.clamp(0, n)
                }
            }
        };
        let start = clamp(self.start, 0);
        let stop = clamp(self.stop, n).max(start);
        Ok(start as u64..stop as u64)
    }
}

impl From<Range<i64>> for ByteSlice {
    fn from(r: Range<i64>) -> Self {
        Self::new(Some(r.start), Some(r.end))
    }
}

impl From<RangeFrom<i64>> for ByteSlice {
    fn from(r: RangeFrom<i64>) -> Self {
        Self::new(Some(r.start), None)
    }
}

impl From<RangeTo<i64>> for ByteSlice {
    fn from(r: RangeTo<i64>) -> Self {
        Self::new(None, Some(r.end))
    }
}

impl From<RangeFull> for ByteSlice {
    fn from(_: RangeFull) -> Self {
        Self::default()
    }
}
