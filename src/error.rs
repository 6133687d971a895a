use thiserror::Error;

/// Errors raised while building the field schema of a structured type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate field tag {0}")]
    DuplicateFieldTag(u32),

    #[error("field tag {0} is out of range (max {max})", max = crate::wire::MAX_TAG)]
    TagOutOfRange(u64),

    #[error("invalid field annotation: {0:?}")]
    InvalidAttribute(String),
}

/// Specific kinds of errors that can occur when encoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    #[error("tag {0} is too large (max {max})", max = crate::wire::MAX_TAG)]
    MalformedTag(u64),

    #[error("value of {0} bytes is too large (max {max})", max = crate::wire::MAX_VALUE_LEN)]
    MalformedValue(usize),

    #[error("{0}")]
    Schema(SchemaError),

    #[error("type {0} cannot be marshaled")]
    UnsupportedType(&'static str),

    #[error("{0}")]
    Custom(String),

    #[error("i/o error: {0}")]
    Io(std::io::ErrorKind),
}

/// Error type returned when encoding to the binpack format fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("encode error: {kind}")]
pub struct EncodeError {
    kind: EncodeErrorKind,
}

impl EncodeError {
    /// Creates a new EncodeError with the given kind.
    pub const fn new(kind: EncodeErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error carrying a message from a custom marshal hook.
    pub fn custom(msg: impl std::fmt::Display) -> Self {
        Self::new(EncodeErrorKind::Custom(msg.to_string()))
    }

    pub(crate) fn unsupported<T: ?Sized>() -> Self {
        Self::new(EncodeErrorKind::UnsupportedType(std::any::type_name::<T>()))
    }

    /// Returns the specific kind of encode error that occurred.
    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }
}

impl From<SchemaError> for EncodeError {
    fn from(err: SchemaError) -> Self {
        Self::new(EncodeErrorKind::Schema(err))
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        Self::new(EncodeErrorKind::Io(err.kind()))
    }
}

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Specific kinds of errors that can occur when decoding binpack data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid encoding of {ty}: {len} bytes")]
    InvalidScalar { ty: &'static str, len: usize },

    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("packed container declares {declared} elements, found {actual}")]
    InvalidContainerCount { declared: usize, actual: usize },

    #[error("{0}")]
    Schema(SchemaError),

    #[error("type {0} cannot be unmarshaled")]
    UnsupportedType(&'static str),

    #[error("{0}")]
    Custom(String),

    #[error("i/o error: {0}")]
    Io(std::io::ErrorKind),
}

/// Error type returned when decoding binpack data fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decode error: {kind}")]
pub struct DecodeError {
    kind: DecodeErrorKind,
}

impl DecodeError {
    /// Creates a new DecodeError with the given kind.
    pub const fn new(kind: DecodeErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error carrying a message from a custom unmarshal hook.
    pub fn custom(msg: impl std::fmt::Display) -> Self {
        Self::new(DecodeErrorKind::Custom(msg.to_string()))
    }

    pub(crate) const fn truncated(needed: usize, available: usize) -> Self {
        Self::new(DecodeErrorKind::Truncated { needed, available })
    }

    pub(crate) fn invalid_scalar<T: ?Sized>(len: usize) -> Self {
        Self::new(DecodeErrorKind::InvalidScalar {
            ty: std::any::type_name::<T>(),
            len,
        })
    }

    pub(crate) fn unsupported<T: ?Sized>() -> Self {
        Self::new(DecodeErrorKind::UnsupportedType(std::any::type_name::<T>()))
    }

    /// Returns the specific kind of decode error that occurred.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

impl From<SchemaError> for DecodeError {
    fn from(err: SchemaError) -> Self {
        Self::new(DecodeErrorKind::Schema(err))
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        Self::new(DecodeErrorKind::Io(err.kind()))
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
