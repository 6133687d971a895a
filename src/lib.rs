//! Binpack is a compact tag–value binary encoding.
//!
//! A binpack stream is a flat sequence of records. Each record is a
//! variable-width numeric tag followed by a length-prefixed value; the format
//! itself carries no type information, so both sides must agree on what a
//! tag's value means. On top of the record layer, this crate maps Rust values
//! to value bytes: integers are packed big-endian without leading zeros
//! (signed ones zig-zag first), strings and [`Bytes`] are stored verbatim,
//! collections are written as a count followed by their elements, and
//! structs become one record per non-default field.
//!
//! # Examples
//!
//! ```
//! use binpack::{Binpack, marshal, unmarshal};
//! use bytes::Bytes;
//!
//! #[derive(Binpack, Debug, Default, PartialEq)]
//! struct Cake {
//!     #[binpack(tag = 1)]
//!     flavor: String,
//!     #[binpack(tag = 2, pack)]
//!     layers: Vec<u32>,
//! }
//!
//! let cake = Cake {
//!     flavor: "lemon".to_string(),
//!     layers: vec![3, 1],
//! };
//! let data = marshal(&cake).unwrap();
//! assert_eq!(data, b"\x01\x85lemon\x02\x83\x02\x03\x01");
//!
//! let parsed: Cake = unmarshal(Bytes::from(data)).unwrap();
//! assert_eq!(parsed, cake);
//! ```

// Lets the derive's `binpack::` paths resolve inside this crate's own tests.
extern crate self as binpack;

mod buf;
mod error;
mod marshal;
pub mod pack;
mod schema;
mod stream;
mod traits;
mod types;
mod unmarshal;
pub mod wire;

pub use bytes::Bytes;

pub use crate::error::{
    DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeErrorKind, EncodeResult,
    SchemaError,
};
pub use crate::marshal::{marshal, marshal_into, marshal_struct, marshal_with_hook, write_field};
pub use crate::schema::{FieldAttr, FieldDescriptor, FieldKind, Schema};
pub use crate::stream::{Decoder, Encoder, Record, RecordReader};
pub use crate::traits::{Binpack, Marshaler, Shape, Structured, Unmarshaler};
pub use crate::unmarshal::{
    read_field, unmarshal, unmarshal_into, unmarshal_struct, unmarshal_with_hook,
};

/// Derives [`Binpack`] and [`Structured`] for a struct with named fields.
///
/// Fields annotated with `#[binpack(tag = N)]` are encoded under tag `N`;
/// adding `pack` writes a sequence as a single counted record instead of one
/// record per element. Fields without the attribute are ignored. The struct
/// must also implement [`Default`].
///
/// With `#[binpack(custom)]` on the type itself, the derived impl encodes
/// through the type's [`Marshaler`] and [`Unmarshaler`] implementations.
///
/// ```
/// use binpack::Binpack;
///
/// #[derive(Binpack, Default)]
/// struct Horse {
///     #[binpack(tag = 7)]
///     name: String,
///     #[binpack(tag = 8, pack)]
///     scores: Vec<i32>,
///     cached: Option<u64>,
/// }
/// ```
pub use binpack_derive::Binpack;
