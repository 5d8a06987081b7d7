//! Even-split segmentation of transformed order data
//!
//! EBICS caps a segment at 1 MiB of transformed (compressed + encrypted) data.
//! The buffer is not cut into full 1 MiB pieces with a short tail; it is divided
//! evenly across the minimal segment count:
//!
//! ```text
//! num_segments = ceil(len / 1_048_576)
//! segment_size = len / num_segments            (integer division)
//! segment n    = [segment_size * (n-1), segment_size * n)   for n < num_segments
//! last segment = [segment_size * (num_segments-1), len)     carries the remainder
//! ```
//!
//! Segment numbers start at 1. The counterpart must use the same arithmetic.

use ebics_core::return_code::EBICS_TX_SEGMENT_NUMBER_EXCEEDED;
use ebics_core::{EbicsError, EbicsResult};

/// Protocol maximum for one segment
pub const SEGMENT_SIZE: usize = 1_048_576;

/// Position of one segment within the transformed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 1-based segment number
    pub number: u32,
    /// Byte offset within the transformed buffer
    pub offset: usize,
    /// Segment length in bytes
    pub length: usize,
}

/// Number of segments needed for `len` bytes with the given bound.
pub fn segment_count(len: usize, max_segment_size: usize) -> u32 {
    let max = max_segment_size.max(1);
    len.div_ceil(max) as u32
}

/// Splits one fully transformed buffer into its wire segments.
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    buffer: &'a [u8],
    num_segments: u32,
    segment_size: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_max_segment_size(buffer, SEGMENT_SIZE)
    }

    /// Use a smaller bound than the protocol maximum (tests, constrained banks).
    pub fn with_max_segment_size(buffer: &'a [u8], max_segment_size: usize) -> Self {
        let num_segments = segment_count(buffer.len(), max_segment_size);
        let segment_size = if num_segments == 0 {
            0
        } else {
            buffer.len() / num_segments as usize
        };
        Self {
            buffer,
            num_segments,
            segment_size,
        }
    }

    pub fn num_segments(&self) -> u32 {
        self.num_segments
    }

    /// Length of every segment but the last
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    pub fn total_len(&self) -> usize {
        self.buffer.len()
    }

    /// Offset and length of segment `number`.
    pub fn layout(&self, number: u32) -> EbicsResult<Segment> {
        if number == 0 || number > self.num_segments {
            return Err(EbicsError::protocol(
                EBICS_TX_SEGMENT_NUMBER_EXCEEDED,
                format!(
                    "segment {number} out of range 1..={}",
                    self.num_segments
                ),
            ));
        }
        let offset = self.segment_size * (number as usize - 1);
        let end = if number == self.num_segments {
            self.buffer.len()
        } else {
            offset + self.segment_size
        };
        Ok(Segment {
            number,
            offset,
            length: end - offset,
        })
    }

    /// Bytes of segment `number` (1-based).
    pub fn segment(&self, number: u32) -> EbicsResult<&'a [u8]> {
        let seg = self.layout(number)?;
        Ok(&self.buffer[seg.offset..seg.offset + seg.length])
    }

    /// All segments in ascending order.
    pub fn segments(&self) -> impl Iterator<Item = (Segment, &'a [u8])> + '_ {
        (1..=self.num_segments).filter_map(move |n| {
            let seg = self.layout(n).ok()?;
            Some((seg, &self.buffer[seg.offset..seg.offset + seg.length]))
        })
    }
}
