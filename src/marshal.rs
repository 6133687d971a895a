use crate::schema::{FieldDescriptor, FieldKind};
use crate::traits::{Binpack, Marshaler, Structured};
use crate::wire::{write_record, write_tag, write_value};
use crate::{EncodeError, EncodeErrorKind, EncodeResult};

/// Encodes `value` as the value bytes of a single record.
pub fn marshal<T: Binpack>(value: &T) -> EncodeResult<Vec<u8>> {
    let mut buffer = Vec::new();
    value.write_value(&mut buffer)?;
    Ok(buffer)
}

/// Appends the encoding of `value` to `buffer`. On error, `buffer` is left
/// as it was.
pub fn marshal_into<T: Binpack>(value: &T, buffer: &mut Vec<u8>) -> EncodeResult<()> {
    let start = buffer.len();
    value.write_value(buffer).inspect_err(|_| buffer.truncate(start))
}

/// Encodes a structured value as a sequence of records in ascending tag
/// order. Fields holding their zero value are omitted.
pub fn marshal_struct<S: Structured>(value: &S, buffer: &mut Vec<u8>) -> EncodeResult<()> {
    let schema = S::schema()?;
    let start = buffer.len();
    for field in schema.fields() {
        if let Err(e) = value.write_field(field, buffer) {
            buffer.truncate(start);
            return Err(e);
        }
    }
    Ok(())
}

/// Appends the records of one struct field.
pub fn write_field<T: Binpack>(
    value: &T,
    field: &FieldDescriptor,
    buffer: &mut Vec<u8>,
) -> EncodeResult<()> {
    if value.is_default() {
        return Ok(());
    }
    match field.kind() {
        FieldKind::InlineSequence => value.write_inline(field.tag(), buffer),
        FieldKind::Scalar | FieldKind::PackedSequence => {
            let mut data = Vec::new();
            value.write_value(&mut data)?;
            write_record(buffer, field.tag(), &data)
        }
    }
}

/// Encodes a value through its custom [`Marshaler`] hook.
pub fn marshal_with_hook<T: Marshaler>(value: &T, buffer: &mut Vec<u8>) -> EncodeResult<()> {
    let data = value.marshal_binpack()?;
    buffer.extend_from_slice(&data);
    Ok(())
}

fn write_count(buffer: &mut Vec<u8>, count: usize) -> EncodeResult<()> {
    let count = u32::try_from(count)
        .map_err(|_| EncodeError::new(EncodeErrorKind::MalformedTag(count as u64)))?;
    write_tag(buffer, count)
}

/// Writes a packed container: the element count, then each element as a
/// length-prefixed value.
pub(crate) fn write_packed<'a, T, I>(buffer: &mut Vec<u8>, items: I) -> EncodeResult<()>
where
    T: Binpack + 'a,
    I: ExactSizeIterator<Item = &'a T>,
{
    write_count(buffer, items.len())?;
    let mut scratch = Vec::new();
    for item in items {
        scratch.clear();
        item.write_value(&mut scratch)?;
        write_value(buffer, &scratch)?;
    }
    Ok(())
}

/// Like [`write_packed`], but emits elements ordered by their encoding so
/// that unordered collections produce stable output.
pub(crate) fn write_packed_sorted<'a, T, I>(buffer: &mut Vec<u8>, items: I) -> EncodeResult<()>
where
    T: Binpack + 'a,
    I: ExactSizeIterator<Item = &'a T>,
{
    let mut encoded = items.map(marshal).collect::<EncodeResult<Vec<_>>>()?;
    encoded.sort_unstable();

    write_count(buffer, encoded.len())?;
    for item in &encoded {
        write_value(buffer, item)?;
    }
    Ok(())
}

/// Writes a packed map: the entry count, then alternating keys and values.
/// With `sort` set, entries are ordered by their encoded keys.
pub(crate) fn write_packed_map<'a, K, V, I>(
    buffer: &mut Vec<u8>,
    entries: I,
    sort: bool,
) -> EncodeResult<()>
where
    K: Binpack + 'a,
    V: Binpack + 'a,
    I: ExactSizeIterator<Item = (&'a K, &'a V)>,
{
    let mut encoded = entries
        .map(|(k, v)| -> EncodeResult<_> { Ok((marshal(k)?, marshal(v)?)) })
        .collect::<EncodeResult<Vec<_>>>()?;
    if sort {
        encoded.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    }

    write_count(buffer, encoded.len())?;
    for (k, v) in &encoded {
        write_value(buffer, k)?;
        write_value(buffer, v)?;
    }
    Ok(())
}
