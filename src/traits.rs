use bytes::Bytes;

use crate::schema::{FieldDescriptor, Schema};
use crate::wire::write_record;
use crate::{DecodeResult, EncodeResult, SchemaError};

/// How a type is laid out when it appears as a field of a structured type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Encoded as the value of a single record.
    Scalar,
    /// A collection of elements; inline unless the field is packed.
    Sequence,
    /// Key/value pairs; always packed.
    Map,
}

/// Core trait for types that can be marshaled to and unmarshaled from
/// binpack values.
///
/// Unmarshaling writes into an existing value rather than producing a new
/// one: scalars are overwritten, collections are extended, and structured
/// values only have the fields named by the input updated. Fresh targets
/// start from [`Default`].
pub trait Binpack: Default {
    /// The layout of this type when used as a struct field.
    const SHAPE: Shape = Shape::Scalar;

    /// Appends the value bytes of this value to the buffer.
    fn write_value(&self, buffer: &mut Vec<u8>) -> EncodeResult<()>;

    /// Decodes the value bytes in `data` into `self`.
    fn read_value(&mut self, data: Bytes) -> DecodeResult<()>;

    /// Reports whether this is the type's zero value. Struct fields holding
    /// their zero value are not encoded.
    fn is_default(&self) -> bool;

    /// Appends the records for a struct field with the given tag.
    ///
    /// Sequences override this to emit one record per element.
    fn write_inline(&self, tag: u32, buffer: &mut Vec<u8>) -> EncodeResult<()> {
        let mut value = Vec::new();
        self.write_value(&mut value)?;
        write_record(buffer, tag, &value)
    }

    /// Decodes one record of an inline struct field into `self`.
    ///
    /// Sequences override this to append a single element.
    fn read_inline(&mut self, data: Bytes) -> DecodeResult<()> {
        self.read_value(data)
    }
}

/// A record-like type whose fields are addressed by tag.
///
/// This is normally implemented with `#[derive(Binpack)]`, which also
/// implements [`Binpack`] in terms of [`crate::marshal_struct`] and
/// [`crate::unmarshal_struct`].
pub trait Structured: Binpack {
    /// Returns the field schema of this type, sorted by tag.
    fn schema() -> Result<&'static Schema, SchemaError>;

    /// Appends the records for the field described by `field`.
    fn write_field(&self, field: &FieldDescriptor, buffer: &mut Vec<u8>) -> EncodeResult<()>;

    /// Decodes one record into the field described by `field`.
    fn read_field(&mut self, field: &FieldDescriptor, data: Bytes) -> DecodeResult<()>;
}

/// Custom marshal hook.
///
/// Types deriving `Binpack` with `#[binpack(custom)]` encode through this
/// trait instead of the generic engine. The returned bytes are used verbatim
/// as the record value.
pub trait Marshaler {
    fn marshal_binpack(&self) -> EncodeResult<Vec<u8>> {
        Err(crate::EncodeError::unsupported::<Self>())
    }

    /// Reports whether the value should be omitted as a struct field.
    fn is_zero(&self) -> bool {
        false
    }
}

/// Custom unmarshal hook, the counterpart of [`Marshaler`].
pub trait Unmarshaler {
    fn unmarshal_binpack(&mut self, data: &[u8]) -> DecodeResult<()> {
        let _ = data;
        Err(crate::DecodeError::unsupported::<Self>())
    }
}
