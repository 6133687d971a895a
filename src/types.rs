use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

use bytes::Bytes;

use crate::marshal::{marshal, write_packed, write_packed_map, write_packed_sorted};
use crate::pack::{pack_i64, pack_u64, unpack_i64, unpack_u64};
use crate::stream::RecordReader;
use crate::traits::{Binpack, Shape};
use crate::unmarshal::{one_byte, read_packed, read_packed_map, unmarshal};
use crate::wire::write_record;
use crate::{DecodeError, DecodeErrorKind, DecodeResult, EncodeResult};

impl Binpack for bool {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        buffer.push(u8::from(*self));
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        *self = one_byte::<bool>(&data)? != 0;
        Ok(())
    }

    fn is_default(&self) -> bool {
        !*self
    }
}

// A u8 is a raw byte rather than a packed number, so it must decode from
// exactly one byte.
impl Binpack for u8 {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        buffer.push(*self);
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        *self = one_byte::<u8>(&data)?;
        Ok(())
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

macro_rules! impl_binpack_unsigned {
    ($ty:ty) => {
        impl Binpack for $ty {
            fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
                pack_u64(buffer, *self as u64);
                Ok(())
            }

            fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
                let invalid = || DecodeError::invalid_scalar::<$ty>(data.len());
                let z = unpack_u64(&data).map_err(|_| invalid())?;
                *self = <$ty>::try_from(z).map_err(|_| invalid())?;
                Ok(())
            }

            fn is_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

impl_binpack_unsigned!(u16);
impl_binpack_unsigned!(u32);
impl_binpack_unsigned!(u64);
impl_binpack_unsigned!(usize);

macro_rules! impl_binpack_signed {
    ($ty:ty) => {
        impl Binpack for $ty {
            fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
                pack_i64(buffer, *self as i64);
                Ok(())
            }

            fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
                let invalid = || DecodeError::invalid_scalar::<$ty>(data.len());
                let v = unpack_i64(&data).map_err(|_| invalid())?;
                *self = <$ty>::try_from(v).map_err(|_| invalid())?;
                Ok(())
            }

            fn is_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

impl_binpack_signed!(i8);
impl_binpack_signed!(i16);
impl_binpack_signed!(i32);
impl_binpack_signed!(i64);
impl_binpack_signed!(isize);

macro_rules! impl_binpack_float {
    ($ty:ty, $bits:ty) => {
        impl Binpack for $ty {
            fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
                pack_u64(buffer, u64::from(self.to_bits()));
                Ok(())
            }

            fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
                let invalid = || DecodeError::invalid_scalar::<$ty>(data.len());
                let z = unpack_u64(&data).map_err(|_| invalid())?;
                *self = <$ty>::from_bits(<$bits>::try_from(z).map_err(|_| invalid())?);
                Ok(())
            }

            // Negative zero has a non-zero bit pattern and is kept.
            fn is_default(&self) -> bool {
                self.to_bits() == 0
            }
        }
    };
}

impl_binpack_float!(f32, u32);
impl_binpack_float!(f64, u64);

impl Binpack for char {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        pack_u64(buffer, u64::from(*self));
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        let invalid = || DecodeError::invalid_scalar::<char>(data.len());
        let z = unpack_u64(&data).map_err(|_| invalid())?;
        *self = u32::try_from(z)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(invalid)?;
        Ok(())
    }

    fn is_default(&self) -> bool {
        *self == '\0'
    }
}

impl Binpack for String {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        buffer.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        *self = String::from_utf8(data.to_vec())
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8))?;
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// Raw bytes, written verbatim. Also the target for values whose type is not
/// known to the reader.
impl Binpack for Bytes {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        buffer.extend_from_slice(self);
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        *self = data;
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

/// The empty record: no fields, so it encodes to no bytes and ignores any
/// records it is given.
impl Binpack for () {
    fn write_value(&self, _buffer: &mut Vec<u8>) -> EncodeResult<()> {
        Ok(())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        for record in RecordReader::new(data) {
            record?;
        }
        Ok(())
    }

    fn is_default(&self) -> bool {
        true
    }
}

/// `None` is written as a single zero byte. Decoding always produces `Some`,
/// since that placeholder cannot be told apart from an encoded zero value.
impl<T: Binpack> Binpack for Option<T> {
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        match self {
            Some(value) => value.write_value(buffer),
            None => {
                buffer.push(0);
                Ok(())
            }
        }
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        *self = Some(unmarshal(data)?);
        Ok(())
    }

    fn is_default(&self) -> bool {
        self.is_none()
    }
}

impl<T: Binpack> Binpack for Box<T> {
    const SHAPE: Shape = T::SHAPE;

    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        (**self).write_value(buffer)
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        (**self).read_value(data)
    }

    fn is_default(&self) -> bool {
        (**self).is_default()
    }

    fn write_inline(&self, tag: u32, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        (**self).write_inline(tag, buffer)
    }

    fn read_inline(&mut self, data: Bytes) -> DecodeResult<()> {
        (**self).read_inline(data)
    }
}

/// Writes one record per element, all sharing `tag`.
fn write_inline_elements<'a, T, I>(tag: u32, buffer: &mut Vec<u8>, items: I) -> EncodeResult<()>
where
    T: Binpack + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut scratch = Vec::new();
    for item in items {
        scratch.clear();
        item.write_value(&mut scratch)?;
        write_record(buffer, tag, &scratch)?;
    }
    Ok(())
}

macro_rules! impl_binpack_sequence {
    ($ty:ty, $push:ident, [$($generics:tt)*]) => {
        impl<$($generics)*> Binpack for $ty {
            const SHAPE: Shape = Shape::Sequence;

            fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
                write_packed(buffer, self.iter())
            }

            fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
                read_packed(data, |element| self.$push(element))
            }

            fn is_default(&self) -> bool {
                self.is_empty()
            }

            fn write_inline(&self, tag: u32, buffer: &mut Vec<u8>) -> EncodeResult<()> {
                write_inline_elements(tag, buffer, self.iter())
            }

            fn read_inline(&mut self, data: Bytes) -> DecodeResult<()> {
                self.$push(unmarshal(data)?);
                Ok(())
            }
        }
    };
}

impl_binpack_sequence!(Vec<T>, push, [T: Binpack]);
impl_binpack_sequence!(VecDeque<T>, push_back, [T: Binpack]);

#[cfg(feature = "smallvec")]
impl_binpack_sequence!(smallvec::SmallVec<A>, push, [A: smallvec::Array<Item: Binpack>]);

impl<T: Binpack + Ord> Binpack for BTreeSet<T> {
    const SHAPE: Shape = Shape::Sequence;

    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        write_packed(buffer, self.iter())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        read_packed(data, |element| {
            self.insert(element);
        })
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn write_inline(&self, tag: u32, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        write_inline_elements(tag, buffer, self.iter())
    }

    fn read_inline(&mut self, data: Bytes) -> DecodeResult<()> {
        self.insert(unmarshal(data)?);
        Ok(())
    }
}

impl<T: Binpack + Eq + Hash, S: BuildHasher + Default> Binpack for HashSet<T, S> {
    const SHAPE: Shape = Shape::Sequence;

    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        write_packed_sorted(buffer, self.iter())
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        read_packed(data, |element| {
            self.insert(element);
        })
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn write_inline(&self, tag: u32, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        let mut encoded = self
            .iter()
            .map(marshal)
            .collect::<EncodeResult<Vec<_>>>()?;
        encoded.sort_unstable();
        for value in &encoded {
            write_record(buffer, tag, value)?;
        }
        Ok(())
    }

    fn read_inline(&mut self, data: Bytes) -> DecodeResult<()> {
        self.insert(unmarshal(data)?);
        Ok(())
    }
}

impl<K, V, S> Binpack for HashMap<K, V, S>
where
    K: Binpack + Eq + Hash,
    V: Binpack,
    S: BuildHasher + Default,
{
    const SHAPE: Shape = Shape::Map;

    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        write_packed_map(buffer, self.iter(), true)
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        read_packed_map(data, |key, value| {
            self.insert(key, value);
        })
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Binpack + Ord, V: Binpack> Binpack for BTreeMap<K, V> {
    const SHAPE: Shape = Shape::Map;

    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        write_packed_map(buffer, self.iter(), false)
    }

    fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
        read_packed_map(data, |key, value| {
            self.insert(key, value);
        })
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(feature = "chrono")]
mod chrono_impls {
    use bytes::Bytes;
    use chrono::{DateTime, Utc};

    use crate::marshal::marshal_with_hook;
    use crate::pack::{pack_i64, unpack_i64};
    use crate::traits::{Binpack, Marshaler, Unmarshaler};
    use crate::unmarshal::unmarshal_with_hook;
    use crate::{DecodeError, DecodeResult, EncodeResult};

    // Timestamps are packed as signed microseconds since the Unix epoch.
    impl Marshaler for DateTime<Utc> {
        fn marshal_binpack(&self) -> EncodeResult<Vec<u8>> {
            let mut buffer = Vec::new();
            pack_i64(&mut buffer, self.timestamp_micros());
            Ok(buffer)
        }

        fn is_zero(&self) -> bool {
            *self == DateTime::UNIX_EPOCH
        }
    }

    impl Unmarshaler for DateTime<Utc> {
        fn unmarshal_binpack(&mut self, data: &[u8]) -> DecodeResult<()> {
            let invalid = || DecodeError::invalid_scalar::<DateTime<Utc>>(data.len());
            let micros = unpack_i64(data).map_err(|_| invalid())?;
            *self = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
            Ok(())
        }
    }

    impl Binpack for DateTime<Utc> {
        fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()> {
            marshal_with_hook(self, buffer)
        }

        fn read_value(&mut self, data: Bytes) -> DecodeResult<()> {
            unmarshal_with_hook(self, data)
        }

        fn is_default(&self) -> bool {
            self.is_zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
    use std::fmt::Debug;

    use crate::{Binpack, DecodeError, DecodeErrorKind, marshal, unmarshal};
    use bytes::Bytes;
    use proptest::prelude::*;

    fn roundtrip<T: Binpack + PartialEq + Debug>(value: T) {
        let data = marshal(&value).unwrap();
        assert_eq!(unmarshal::<T>(Bytes::from(data)), Ok(value));
    }

    #[test]
    fn test_integer_widths() {
        roundtrip(u16::MAX);
        roundtrip(u32::MAX);
        roundtrip(u64::MAX);
        roundtrip(usize::MAX);
        roundtrip(i8::MIN);
        roundtrip(i16::MIN);
        roundtrip(i32::MIN);
        roundtrip(i64::MIN);
        roundtrip(isize::MAX);
        roundtrip(255u8);
    }

    #[test]
    fn test_floats() {
        roundtrip(0.0f32);
        roundtrip(-0.0f64);
        roundtrip(f64::INFINITY);
        roundtrip(std::f32::consts::E);
        assert!(!(-0.0f64).is_default());
        assert!(0.0f32.is_default());
        assert_eq!(marshal(&0.0f64), Ok(vec![0x00]));

        let nan = unmarshal::<f64>(Bytes::from(marshal(&f64::NAN).unwrap())).unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn test_char() {
        roundtrip('x');
        roundtrip('\u{1F980}');
        assert_eq!(
            unmarshal::<char>(Bytes::from_static(&[0xD8, 0x00])),
            Err(DecodeError::new(DecodeErrorKind::InvalidScalar {
                ty: "char",
                len: 2
            }))
        );
    }

    #[test]
    fn test_unit() {
        assert_eq!(marshal(&()), Ok(vec![]));
        assert_eq!(unmarshal::<()>(Bytes::from_static(b"\x01\x02")), Ok(()));
        assert_eq!(
            unmarshal::<()>(Bytes::from_static(b"\x01")),
            Err(DecodeError::new(DecodeErrorKind::Truncated {
                needed: 1,
                available: 0
            }))
        );
    }

    #[test]
    fn test_option_and_box() {
        roundtrip(Some("x".to_string()));
        roundtrip(Box::new(42u32));
        roundtrip(Some(Box::new(vec![1u8, 2])));
        // The null placeholder decodes as a present zero value.
        assert_eq!(
            unmarshal::<Option<u32>>(Bytes::from(marshal(&None::<u32>).unwrap())),
            Ok(Some(0))
        );
    }

    #[test]
    fn test_collections() {
        roundtrip(vec![vec![1u32], vec![], vec![2, 3]]);
        roundtrip(VecDeque::from([1i64, -1]));
        roundtrip(BTreeSet::from(["b".to_string(), "a".to_string()]));
        roundtrip(HashSet::<u32>::from([9, 10, 11]));
        roundtrip(BTreeMap::from([(1u8, Some(2u16)), (3, Some(4))]));
        roundtrip(HashMap::<String, ()>::from([
            ("horse".to_string(), ()),
            ("cake".to_string(), ()),
        ]));
    }

    #[test]
    fn test_vec_of_bytes_is_a_sequence() {
        // Only `Bytes` is written verbatim; a `Vec<u8>` is a packed sequence.
        assert_eq!(marshal(&vec![1u8, 2]), Ok(vec![0x02, 0x01, 0x02]));
        assert_eq!(marshal(&Bytes::from_static(&[1, 2])), Ok(vec![0x01, 0x02]));
    }

    #[cfg(feature = "smallvec")]
    #[test]
    fn test_smallvec() {
        let value: smallvec::SmallVec<[u32; 4]> = smallvec::smallvec![1, 2, 300];
        assert_eq!(marshal(&value), marshal(&vec![1u32, 2, 300]));
        roundtrip(value);
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn test_datetime() {
        use chrono::{DateTime, TimeZone, Utc};

        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        roundtrip(when);
        roundtrip(Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap());
        assert!(DateTime::<Utc>::default().is_default());
        assert_eq!(marshal(&DateTime::<Utc>::UNIX_EPOCH), Ok(vec![0x00]));
    }

    proptest! {
        #[test]
        fn prop_signed_roundtrip(v in any::<i32>()) {
            let data = marshal(&v).unwrap();
            prop_assert!(data.len() <= 5);
            prop_assert_eq!(unmarshal::<i32>(Bytes::from(data)), Ok(v));
        }

        #[test]
        fn prop_string_vec_roundtrip(v in proptest::collection::vec(".*", 0..8)) {
            let data = marshal(&v).unwrap();
            prop_assert_eq!(unmarshal::<Vec<String>>(Bytes::from(data)), Ok(v));
        }

        #[test]
        fn prop_map_roundtrip(m in proptest::collection::btree_map(any::<u64>(), any::<i16>(), 0..16)) {
            let data = marshal(&m).unwrap();
            prop_assert_eq!(unmarshal::<BTreeMap<u64, i16>>(Bytes::from(data)), Ok(m));
        }
    }
}
