//! ebics-segments: splitting transformed order data into wire segments and joining them back
//!
//! # Overview
//! - `segmenter`: even-split arithmetic over a fully transformed buffer
//! - `joiner`: in-order reassembly followed by decrypt + inflate

pub mod joiner;
pub mod segmenter;

pub use joiner::Joiner;
pub use segmenter::{segment_count, Segment, Segmenter, SEGMENT_SIZE};
