//! Bit layouts of record tags and record values.
//!
//! A tag is 1, 2 or 4 bytes; the top bits of its first byte select the size:
//!
//! ```text
//! 0xxxxxxx                            values 0..=127
//! 10xxxxxx xxxxxxxx                   values 0..=16383
//! 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx values 0..=2^30-1
//! ```
//!
//! A value starts with an index byte:
//!
//! ```text
//! 0xxxxxxx                            the value is this single byte (< 128)
//! 10nnnnnn + n bytes                  length 0..=63
//! 110nnnnn nnnnnnnn + n bytes         length 0..=8191
//! 111nnnnn nnnnnnnn*3 + n bytes       length 0..=2^29-1
//! ```

use bytes::Bytes;

use crate::buf::ByteSource;
use crate::{DecodeResult, EncodeError, EncodeErrorKind, EncodeResult};

/// Largest tag the wire format can carry.
pub const MAX_TAG: u32 = (1 << 30) - 1;

/// Largest value length the wire format can carry.
pub const MAX_VALUE_LEN: usize = (1 << 29) - 1;

/// Returns the number of bytes needed to encode `tag`, or `None` if it is
/// out of range.
pub fn tag_size(tag: u32) -> Option<usize> {
    if tag < (1 << 7) {
        Some(1)
    } else if tag < (1 << 14) {
        Some(2)
    } else if tag <= MAX_TAG {
        Some(4)
    } else {
        None
    }
}

/// Appends the encoding of `tag` to `buffer`.
pub fn write_tag(buffer: &mut Vec<u8>, tag: u32) -> EncodeResult<()> {
    match tag_size(tag) {
        Some(1) => buffer.push(tag as u8),
        Some(2) => buffer.extend_from_slice(&[0x80 | (tag >> 8) as u8, tag as u8]),
        Some(_) => {
            let bytes = tag.to_be_bytes();
            buffer.extend_from_slice(&[0xC0 | bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        None => {
            return Err(EncodeError::new(EncodeErrorKind::MalformedTag(u64::from(
                tag,
            ))));
        }
    }
    Ok(())
}

/// Returns the number of index and length bytes that precede `value` on the
/// wire, or `None` if it is too long. A single byte below 128 is its own
/// index byte, so its prefix size is 0.
pub fn value_prefix_size(value: &[u8]) -> Option<usize> {
    match value.len() {
        1 if value[0] < 0x80 => Some(0),
        n if n < (1 << 6) => Some(1),
        n if n < (1 << 13) => Some(2),
        n if n <= MAX_VALUE_LEN => Some(4),
        _ => None,
    }
}

/// Appends the encoding of `value` to `buffer`.
pub fn write_value(buffer: &mut Vec<u8>, value: &[u8]) -> EncodeResult<()> {
    let n = value.len();
    match value_prefix_size(value) {
        Some(0) => {
            buffer.push(value[0]);
            return Ok(());
        }
        Some(1) => buffer.push(0x80 | n as u8),
        Some(2) => buffer.extend_from_slice(&[0xC0 | (n >> 8) as u8, n as u8]),
        Some(_) => buffer.extend_from_slice(&[
            0xE0 | (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ]),
        None => return Err(EncodeError::new(EncodeErrorKind::MalformedValue(n))),
    }
    buffer.extend_from_slice(value);
    Ok(())
}

/// Appends one complete record to `buffer`.
pub fn write_record(buffer: &mut Vec<u8>, tag: u32, value: &[u8]) -> EncodeResult<()> {
    let tag_len = tag_size(tag).unwrap_or(0);
    let prefix_len = value_prefix_size(value).unwrap_or(0);
    buffer.reserve(tag_len + prefix_len + value.len());
    write_tag(buffer, tag)?;
    write_value(buffer, value)
}

/// Reads a tag, returning `None` if the source is exhausted before its
/// first byte.
pub(crate) fn read_tag<S: ByteSource>(src: &mut S) -> DecodeResult<Option<u32>> {
    let Some(b) = src.next_byte()? else {
        return Ok(None);
    };
    let tag = match b >> 6 {
        0 | 1 => u32::from(b),
        2 => {
            let rest = src.take(1)?;
            u32::from(b & 0x3F) << 8 | u32::from(rest[0])
        }
        _ => {
            let rest = src.take(3)?;
            u32::from_be_bytes([b & 0x3F, rest[0], rest[1], rest[2]])
        }
    };
    Ok(Some(tag))
}

/// Reads a value, returning `None` if the source is exhausted before its
/// index byte.
pub(crate) fn read_value<S: ByteSource>(src: &mut S) -> DecodeResult<Option<Bytes>> {
    let Some(b) = src.next_byte()? else {
        return Ok(None);
    };
    let n = match b >> 5 {
        0..=3 => return Ok(Some(Bytes::copy_from_slice(&[b]))),
        4 | 5 => usize::from(b & 0x3F),
        6 => {
            let rest = src.take(1)?;
            usize::from(b & 0x1F) << 8 | usize::from(rest[0])
        }
        _ => {
            let rest = src.take(3)?;
            u32::from_be_bytes([b & 0x1F, rest[0], rest[1], rest[2]]) as usize
        }
    };
    src.take(n).map(Some)
}

#[cfg(test)]
mod tests {
    use super::{
        MAX_TAG, MAX_VALUE_LEN, read_tag, read_value, tag_size, value_prefix_size, write_record,
        write_tag, write_value,
    };
    use crate::{DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeErrorKind};
    use bytes::Bytes;
    use proptest::prelude::*;

    fn encoded_tag(tag: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        write_tag(&mut buffer, tag).unwrap();
        buffer
    }

    #[test]
    fn test_tag_boundaries() {
        assert_eq!(encoded_tag(127), [0x7F]);
        assert_eq!(encoded_tag(128), [0x80, 0x80]);
        assert_eq!(encoded_tag(16383), [0xBF, 0xFF]);
        assert_eq!(encoded_tag(16384), [0xC0, 0x00, 0x40, 0x00]);
        assert_eq!(encoded_tag(MAX_TAG), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(tag_size(MAX_TAG + 1), None);

        let mut buffer = Vec::new();
        assert_eq!(
            write_tag(&mut buffer, 1 << 30),
            Err(EncodeError::new(EncodeErrorKind::MalformedTag(1 << 30)))
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_value_boundaries() {
        assert_eq!(value_prefix_size(&[0x7F]), Some(0));
        assert_eq!(value_prefix_size(&[0x80]), Some(1));
        assert_eq!(value_prefix_size(&[]), Some(1));
        assert_eq!(value_prefix_size(&[0; 63]), Some(1));
        assert_eq!(value_prefix_size(&[0; 64]), Some(2));
        assert_eq!(value_prefix_size(&[0; 8191]), Some(2));
        assert_eq!(value_prefix_size(&[0; 8192]), Some(4));
    }

    #[test]
    fn test_value_too_large() {
        let value = vec![0u8; MAX_VALUE_LEN + 1];
        assert_eq!(value_prefix_size(&value), None);
        let mut buffer = Vec::new();
        assert_eq!(
            write_value(&mut buffer, &value),
            Err(EncodeError::new(EncodeErrorKind::MalformedValue(
                MAX_VALUE_LEN + 1
            )))
        );
    }

    #[test]
    fn test_record_vectors() {
        let cases: &[(u32, &[u8], &[u8])] = &[
            (0, b"\x00", b"\x00\x00"),
            (0, b"\x10", b"\x00\x10"),
            (1, b"\x8f", b"\x01\x81\x8f"),
            (0, b"", b"\x00\x80"),
            (0, b"foo", b"\x00\x83foo"),
            (15, b"crazytrain", b"\x0f\x8acrazytrain"),
            (129, b"\x00", b"\x80\x81\x00"),
            (18000, b"\x7f", b"\xC0\x00\x46\x50\x7f"),
        ];
        for (tag, value, want) in cases {
            let mut buffer = Vec::new();
            write_record(&mut buffer, *tag, value).unwrap();
            assert_eq!(buffer.as_slice(), *want, "tag {tag} value {value:?}");

            let mut src = Bytes::from(buffer);
            assert_eq!(read_tag(&mut src), Ok(Some(*tag)));
            assert_eq!(read_value(&mut src), Ok(Some(Bytes::copy_from_slice(value))));
            assert_eq!(read_tag(&mut src), Ok(None));
        }
    }

    #[test]
    fn test_long_value_vectors() {
        let medium = vec![b'x'; 75];
        let mut buffer = Vec::new();
        write_record(&mut buffer, 72, &medium).unwrap();
        assert_eq!(&buffer[..3], &[0x48, 0xC0, 0x4B]);
        assert_eq!(buffer.len(), 3 + 75);

        let long = vec![b'a'; 9000];
        let mut buffer = Vec::new();
        write_record(&mut buffer, 170, &long).unwrap();
        assert_eq!(&buffer[..6], &[0x80, 0xAA, 0xE0, 0x00, 0x23, 0x28]);

        let mut src = Bytes::from(buffer);
        assert_eq!(read_tag(&mut src), Ok(Some(170)));
        assert_eq!(read_value(&mut src), Ok(Some(Bytes::from(long))));
    }

    #[test]
    fn test_long_length_uses_high_bits() {
        // 0xE1 carries bit 24 of the length.
        let mut src = Bytes::from_static(&[0xE1, 0x00, 0x00, 0x00]);
        assert_eq!(
            read_value(&mut src),
            Err(DecodeError::new(DecodeErrorKind::Truncated {
                needed: 1 << 24,
                available: 0
            }))
        );
    }

    fn truncated<T>(needed: usize, available: usize) -> DecodeResult<T> {
        Err(DecodeError::new(DecodeErrorKind::Truncated { needed, available }))
    }

    #[test]
    fn test_truncated_reads() {
        assert_eq!(read_tag(&mut Bytes::from_static(&[0x80])), truncated(1, 0));
        assert_eq!(
            read_tag(&mut Bytes::from_static(&[0xC0, 0x00])),
            truncated(3, 1)
        );
        assert_eq!(read_value(&mut Bytes::from_static(&[0xC0])), truncated(1, 0));
        assert_eq!(
            read_value(&mut Bytes::from_static(&[0xE0, 0x00])),
            truncated(3, 1)
        );
        assert_eq!(
            read_value(&mut Bytes::from_static(&[0x83, b'f'])),
            truncated(3, 1)
        );
        assert_eq!(read_value(&mut Bytes::new()), Ok(None));
    }

    proptest! {
        #[test]
        fn prop_record_roundtrip(
            tag in 0..=MAX_TAG,
            value in proptest::collection::vec(any::<u8>(), 0..300),
        ) {
            let mut buffer = Vec::new();
            write_record(&mut buffer, tag, &value).unwrap();
            prop_assert_eq!(
                buffer.len(),
                tag_size(tag).unwrap() + value_prefix_size(&value).unwrap()
                    + if value_prefix_size(&value) == Some(0) { 0 } else { value.len() }
            );

            let mut src = Bytes::from(buffer);
            prop_assert_eq!(read_tag(&mut src), Ok(Some(tag)));
            prop_assert_eq!(read_value(&mut src), Ok(Some(Bytes::from(value))));
            prop_assert!(src.is_empty());
        }
    }
}
