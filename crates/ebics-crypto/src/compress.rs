//! zlib (deflate) compression of order data at maximum level
//!
//! Decompression only succeeds on a complete stream: truncated or corrupt input
//! is an error, never a short result.

use ebics_core::{EbicsError, EbicsResult};
use flate2::read::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Read;

/// Output growth step while inflating
const INFLATE_CHUNK: usize = 64 * 1024;

/// Compress a byte slice.
pub fn compress(data: &[u8]) -> EbicsResult<Vec<u8>> {
    compress_reader(data)
}

/// Compress everything `source` yields. Read failures are reported as I/O errors.
pub fn compress_reader<R: Read>(source: R) -> EbicsResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(source, Compression::best());
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .map_err(|e| EbicsError::io("compressing order data", e))?;
    Ok(out)
}

/// Inflate a complete zlib stream.
pub fn decompress(data: &[u8]) -> EbicsResult<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(INFLATE_CHUNK));

    loop {
        if out.len() == out.capacity() {
            out.reserve(INFLATE_CHUNK);
        }
        let before = (inflater.total_in(), inflater.total_out());
        let input = &data[inflater.total_in() as usize..];
        let status = inflater
            .decompress_vec(input, &mut out, FlushDecompress::None)
            .map_err(|e| EbicsError::crypto(format!("inflating order data: {e}")))?;

        match status {
            Status::StreamEnd => {
                let consumed = inflater.total_in() as usize;
                if consumed != data.len() {
                    return Err(EbicsError::crypto(format!(
                        "inflating order data: {} trailing bytes after end of stream",
                        data.len() - consumed
                    )));
                }
                return Ok(out);
            }
            Status::Ok | Status::BufError => {
                let stalled = (inflater.total_in(), inflater.total_out()) == before;
                if stalled && out.len() < out.capacity() {
                    return Err(EbicsError::crypto(format!(
                        "inflating order data: stream truncated after {} of {} bytes",
                        inflater.total_in(),
                        data.len()
                    )));
                }
            }
        }
    }
}
