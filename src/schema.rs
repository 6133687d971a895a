use std::str::FromStr;

use crate::SchemaError;
use crate::traits::Shape;
use crate::wire::MAX_TAG;

/// How the records of a struct field are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// One record holding the field's value.
    Scalar,
    /// One record per element, all sharing the field's tag.
    InlineSequence,
    /// One record holding a count followed by every element.
    PackedSequence,
}

impl FieldKind {
    /// Selects the layout for a field of the given shape.
    ///
    /// Maps have no inline form, so they are packed whether or not `pack`
    /// was requested.
    pub const fn of(shape: Shape, pack: bool) -> Self {
        match shape {
            Shape::Scalar => FieldKind::Scalar,
            Shape::Sequence if pack => FieldKind::PackedSequence,
            Shape::Sequence => FieldKind::InlineSequence,
            Shape::Map => FieldKind::PackedSequence,
        }
    }
}

/// A parsed field annotation of the form `tag=N` or `tag=N,pack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAttr {
    pub tag: u32,
    pub pack: bool,
}

impl FromStr for FieldAttr {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidAttribute(s.to_string());

        let mut tag = None;
        let mut pack = false;
        for arg in s.split(',').map(str::trim) {
            if arg == "pack" && !pack {
                pack = true;
            } else if let Some(value) = arg.strip_prefix("tag")
                && let Some(value) = value.trim_start().strip_prefix('=')
                && tag.is_none()
            {
                let value: u64 = value.trim().parse().map_err(|_| invalid())?;
                if value > u64::from(MAX_TAG) {
                    return Err(SchemaError::TagOutOfRange(value));
                }
                tag = Some(value as u32);
            } else {
                return Err(invalid());
            }
        }

        let tag = tag.ok_or_else(invalid)?;
        Ok(FieldAttr { tag, pack })
    }
}

/// Describes one tagged field of a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    index: usize,
    tag: u32,
    kind: FieldKind,
    name: &'static str,
}

impl FieldDescriptor {
    /// Creates a descriptor for the field at position `index` in the type's
    /// declaration.
    pub const fn new(
        index: usize,
        name: &'static str,
        tag: u32,
        shape: Shape,
        pack: bool,
    ) -> Self {
        FieldDescriptor {
            index,
            tag,
            kind: FieldKind::of(shape, pack),
            name,
        }
    }

    /// Creates a descriptor from a textual annotation such as `"tag=3,pack"`.
    pub fn parse(
        index: usize,
        name: &'static str,
        annotation: &str,
        shape: Shape,
    ) -> Result<Self, SchemaError> {
        let attr: FieldAttr = annotation.parse()?;
        Ok(FieldDescriptor::new(index, name, attr.tag, shape, attr.pack))
    }

    /// Position of the field in the type's declaration.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The tagged fields of a structured type, sorted by ascending tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Builds a schema, rejecting tags out of range and tags used twice.
    pub fn new(
        type_name: &str,
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut fields: Vec<_> = fields.into_iter().collect();
        fields.sort_by_key(|f| f.tag);

        if let Some(f) = fields.iter().find(|f| f.tag > MAX_TAG) {
            return Err(SchemaError::TagOutOfRange(u64::from(f.tag)));
        }
        for window in fields.windows(2) {
            if window[0].tag == window[1].tag {
                return Err(SchemaError::DuplicateFieldTag(window[0].tag));
            }
        }

        tracing::debug!(type_name, fields = fields.len(), "built field schema");
        Ok(Schema { fields })
    }

    /// Returns the descriptor for `tag`, if the type has such a field.
    pub fn find(&self, tag: u32) -> Option<&FieldDescriptor> {
        self.fields
            .binary_search_by_key(&tag, |f| f.tag)
            .ok()
            .map(|i| &self.fields[i])
    }

    /// Returns the descriptors in ascending tag order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldAttr, FieldDescriptor, FieldKind, Schema};
    use crate::SchemaError;
    use crate::traits::Shape;

    #[test]
    fn test_parse_attr() {
        assert_eq!("tag=3".parse::<FieldAttr>(), Ok(FieldAttr { tag: 3, pack: false }));
        assert_eq!(
            "tag=24,pack".parse::<FieldAttr>(),
            Ok(FieldAttr { tag: 24, pack: true })
        );
        assert_eq!(
            "tag = 7 , pack".parse::<FieldAttr>(),
            Ok(FieldAttr { tag: 7, pack: true })
        );
        assert_eq!(
            "pack,tag=1".parse::<FieldAttr>(),
            Ok(FieldAttr { tag: 1, pack: true })
        );
    }

    #[test]
    fn test_parse_attr_errors() {
        for bad in ["", "pack", "tag=", "tag=x", "tag=1,packed", "tag=1,tag=2", "id=4"] {
            assert_eq!(
                bad.parse::<FieldAttr>(),
                Err(SchemaError::InvalidAttribute(bad.to_string())),
                "{bad:?}"
            );
        }
        assert_eq!(
            "tag=1073741824".parse::<FieldAttr>(),
            Err(SchemaError::TagOutOfRange(1 << 30))
        );
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(FieldKind::of(Shape::Scalar, false), FieldKind::Scalar);
        assert_eq!(FieldKind::of(Shape::Scalar, true), FieldKind::Scalar);
        assert_eq!(
            FieldKind::of(Shape::Sequence, false),
            FieldKind::InlineSequence
        );
        assert_eq!(
            FieldKind::of(Shape::Sequence, true),
            FieldKind::PackedSequence
        );
        assert_eq!(FieldKind::of(Shape::Map, false), FieldKind::PackedSequence);
    }

    #[test]
    fn test_schema_sorted() {
        let schema = Schema::new(
            "Thing",
            [
                FieldDescriptor::new(0, "name", 10, Shape::Scalar, false),
                FieldDescriptor::new(1, "tags", 30, Shape::Sequence, false),
                FieldDescriptor::new(2, "slogan", 20, Shape::Scalar, false),
            ],
        )
        .unwrap();

        let tags: Vec<u32> = schema.fields().iter().map(|f| f.tag()).collect();
        assert_eq!(tags, [10, 20, 30]);
        assert_eq!(schema.find(30).map(|f| f.name()), Some("tags"));
        assert_eq!(schema.find(30).map(|f| f.index()), Some(1));
        assert_eq!(schema.find(15), None);
    }

    #[test]
    fn test_schema_duplicate_tag() {
        let result = Schema::new(
            "Dup",
            [
                FieldDescriptor::parse(0, "a", "tag=5", Shape::Scalar).unwrap(),
                FieldDescriptor::parse(1, "b", "tag=5,pack", Shape::Sequence).unwrap(),
            ],
        );
        assert_eq!(result, Err(SchemaError::DuplicateFieldTag(5)));
    }

    #[test]
    fn test_schema_tag_out_of_range() {
        let result = Schema::new(
            "Big",
            [FieldDescriptor::new(0, "a", 1 << 30, Shape::Scalar, false)],
        );
        assert_eq!(result, Err(SchemaError::TagOutOfRange(1 << 30)));
    }
}
