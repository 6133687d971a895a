use bytes::Bytes;

use crate::schema::{FieldDescriptor, FieldKind};
use crate::stream::RecordReader;
use crate::traits::{Binpack, Structured, Unmarshaler};
use crate::wire::{read_tag, read_value};
use crate::{DecodeError, DecodeErrorKind, DecodeResult};

/// Decodes the value bytes of a single record into a fresh `T`.
///
/// The format carries no type information: the caller decides what `T` the
/// bytes represent. Decoding into [`Bytes`] returns the input unchanged.
pub fn unmarshal<T: Binpack>(data: Bytes) -> DecodeResult<T> {
    let mut value = T::default();
    value.read_value(data)?;
    Ok(value)
}

/// Decodes `data` into an existing value. Collections are appended to and
/// structured values only have the fields present in `data` replaced.
pub fn unmarshal_into<T: Binpack>(data: Bytes, target: &mut T) -> DecodeResult<()> {
    target.read_value(data)
}

/// Decodes a sequence of records into the fields of a structured value.
///
/// Records whose tag matches no field are skipped, so payloads written by a
/// newer or older version of the type still decode.
pub fn unmarshal_struct<S: Structured>(target: &mut S, data: Bytes) -> DecodeResult<()> {
    let schema = S::schema()?;
    let mut records = RecordReader::new(data);
    while let Some(record) = records.next_record()? {
        match schema.find(record.tag) {
            Some(field) => target.read_field(field, record.value)?,
            None => {
                tracing::trace!(
                    tag = record.tag,
                    len = record.value.len(),
                    "skipping unknown field"
                );
            }
        }
    }
    Ok(())
}

/// Decodes one record into a struct field.
pub fn read_field<T: Binpack>(
    target: &mut T,
    field: &FieldDescriptor,
    data: Bytes,
) -> DecodeResult<()> {
    match field.kind() {
        FieldKind::InlineSequence => target.read_inline(data),
        FieldKind::Scalar | FieldKind::PackedSequence => target.read_value(data),
    }
}

/// Decodes a value through its custom [`Unmarshaler`] hook.
pub fn unmarshal_with_hook<T: Unmarshaler>(target: &mut T, data: Bytes) -> DecodeResult<()> {
    target.unmarshal_binpack(&data)
}

/// Returns the single byte of `data`, or `InvalidScalar` for type `T`.
pub(crate) fn one_byte<T: ?Sized>(data: &[u8]) -> DecodeResult<u8> {
    match data {
        [b] => Ok(*b),
        _ => Err(DecodeError::invalid_scalar::<T>(data.len())),
    }
}

/// Reads the elements of a packed container.
///
/// The reader starts by consuming the declared count, then hands out one
/// embedded value at a time. [`PackedReader::finish`] checks that the number
/// of values consumed matches the count.
pub(crate) struct PackedReader {
    data: Bytes,
    declared: usize,
    consumed: usize,
}

impl PackedReader {
    pub(crate) fn new(mut data: Bytes) -> DecodeResult<Self> {
        let declared = read_tag(&mut data)?.ok_or(DecodeError::truncated(1, 0))?;
        Ok(PackedReader {
            data,
            declared: declared as usize,
            consumed: 0,
        })
    }

    /// Returns the next element, or `None` once the payload is exhausted.
    pub(crate) fn next_element(&mut self) -> DecodeResult<Option<Bytes>> {
        let element = read_value(&mut self.data)?;
        if element.is_some() {
            self.consumed += 1;
        }
        Ok(element)
    }

    /// Returns the next key and value of a packed map.
    pub(crate) fn next_entry(&mut self) -> DecodeResult<Option<(Bytes, Bytes)>> {
        let Some(key) = read_value(&mut self.data)? else {
            return Ok(None);
        };
        // A key with no value is a short count.
        let Some(value) = read_value(&mut self.data)? else {
            return Err(DecodeError::new(DecodeErrorKind::InvalidContainerCount {
                declared: self.declared,
                actual: self.consumed,
            }));
        };
        self.consumed += 1;
        Ok(Some((key, value)))
    }

    pub(crate) fn finish(self) -> DecodeResult<()> {
        if self.consumed != self.declared {
            return Err(DecodeError::new(DecodeErrorKind::InvalidContainerCount {
                declared: self.declared,
                actual: self.consumed,
            }));
        }
        Ok(())
    }
}

/// Decodes a packed sequence, passing each decoded element to `push`.
pub(crate) fn read_packed<T: Binpack>(
    data: Bytes,
    mut push: impl FnMut(T),
) -> DecodeResult<()> {
    let mut reader = PackedReader::new(data)?;
    while let Some(element) = reader.next_element()? {
        push(unmarshal(element)?);
    }
    reader.finish()
}

/// Decodes a packed map, passing each decoded entry to `insert`.
pub(crate) fn read_packed_map<K: Binpack, V: Binpack>(
    data: Bytes,
    mut insert: impl FnMut(K, V),
) -> DecodeResult<()> {
    let mut reader = PackedReader::new(data)?;
    while let Some((key, value)) = reader.next_entry()? {
        insert(unmarshal(key)?, unmarshal(value)?);
    }
    reader.finish()
}
