//! Minimal-width big-endian packing of numeric values.
//!
//! Unsigned magnitudes are written big-endian with leading zero bytes
//! removed; zero is a single `0x00` byte. Signed values are zig-zag mapped
//! first so that small negative numbers stay short, and floating point values
//! are packed through their IEEE-754 bit pattern.

use crate::{DecodeError, DecodeResult};

/// Appends the shortest big-endian encoding of `z` to `buffer`.
pub fn pack_u64(buffer: &mut Vec<u8>, z: u64) {
    let bytes = z.to_be_bytes();
    let skip = (z.leading_zeros() / 8).min(7) as usize;
    buffer.extend_from_slice(&bytes[skip..]);
}

/// Decodes a big-endian magnitude of 1 to 8 bytes.
pub fn unpack_u64(data: &[u8]) -> DecodeResult<u64> {
    if data.is_empty() || data.len() > 8 {
        return Err(DecodeError::invalid_scalar::<u64>(data.len()));
    }
    Ok(data.iter().fold(0u64, |z, &b| (z << 8) | u64::from(b)))
}

/// Maps a signed value onto an unsigned one, keeping small magnitudes small.
pub const fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Inverse of [`zigzag`].
pub const fn unzigzag(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Appends the zig-zag packed encoding of `v` to `buffer`.
pub fn pack_i64(buffer: &mut Vec<u8>, v: i64) {
    pack_u64(buffer, zigzag(v));
}

/// Decodes a zig-zag packed signed value of 1 to 8 bytes.
pub fn unpack_i64(data: &[u8]) -> DecodeResult<i64> {
    unpack_u64(data).map(unzigzag)
}
