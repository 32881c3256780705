//! The decoded value tree (spec §3, "Decoded value").

use num_bigint::BigInt;

use crate::document::Primitive;

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(BigInt),
    I64(BigInt),
    /// Raw 16-bit pattern; never converted to a float (spec §9: "f16").
    F16Bits(u16),
    F32(f32),
    F64(f64),
}

impl PrimitiveValue {
    /// Widens the numeric value to an arbitrary-precision integer, as
    /// required when a field reference terminates on a primitive (spec
    /// §4.1: "The terminal value must be a primitive; widen its numeric to
    /// bigint").
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            PrimitiveValue::U8(v) => Some(BigInt::from(*v)),
            PrimitiveValue::I8(v) => Some(BigInt::from(*v)),
            PrimitiveValue::U16(v) => Some(BigInt::from(*v)),
            PrimitiveValue::I16(v) => Some(BigInt::from(*v)),
            PrimitiveValue::U32(v) => Some(BigInt::from(*v)),
            PrimitiveValue::I32(v) => Some(BigInt::from(*v)),
            PrimitiveValue::U64(v) => Some(v.clone()),
            PrimitiveValue::I64(v) => Some(v.clone()),
            PrimitiveValue::F16Bits(_) | PrimitiveValue::F32(_) | PrimitiveValue::F64(_) => None,
        }
    }
}

/// A single attempted interpretation of a plain union variant (spec §3,
/// "union"). `value` is an `Opaque` node when the attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionAttempt {
    pub variant_name: String,
    pub value: DecodedValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedKind {
    Primitive {
        primitive: Primitive,
        value: PrimitiveValue,
    },
    Struct {
        fields: Vec<(String, DecodedValue)>,
    },
    Array {
        elements: Vec<DecodedValue>,
    },
    Enum {
        tag_value: BigInt,
        variant_name: String,
        inner: Option<Box<DecodedValue>>,
    },
    /// Intentionally ambiguous: every variant interpretation is kept (spec
    /// §4.4, §9: "Ambiguity in unions").
    Union {
        variants: Vec<UnionAttempt>,
        note: String,
    },
    SizeDiscriminatedUnion {
        variant_name: String,
        expected_size: usize,
        inner: Box<DecodedValue>,
    },
    /// A failed union-variant decode, preserving its error as a human
    /// description (spec §3: "opaque").
    Opaque { description: String, raw: Vec<u8> },
}

/// A node in the decoded value tree. Every node carries its absolute byte
/// range in the original buffer, the raw hex of those bytes, and an
/// optional type-name label (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    pub offset: usize,
    pub length: usize,
    pub raw_hex: String,
    pub type_name: Option<String>,
    pub kind: DecodedKind,
}

impl DecodedValue {
    pub fn opaque(offset: usize, description: String) -> Self {
        DecodedValue {
            offset,
            length: 0,
            raw_hex: String::new(),
            type_name: None,
            kind: DecodedKind::Opaque {
                description,
                raw: Vec::new(),
            },
        }
    }

    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    /// Looks up a named field when this value is a struct.
    pub fn struct_field(&self, name: &str) -> Option<&DecodedValue> {
        match &self.kind {
            DecodedKind::Struct { fields } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// The terminal bigint value of a primitive leaf, or `None` for any
    /// non-primitive / non-integer-representable node.
    pub fn as_primitive_bigint(&self) -> Option<BigInt> {
        match &self.kind {
            DecodedKind::Primitive { value, .. } => value.to_bigint(),
            _ => None,
        }
    }
}
