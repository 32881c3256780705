//! The ABI document data model (spec §3) and its JSON deserialization.
//!
//! How the document is authored is an external concern (spec §6: "the CORE
//! consumes an opaque abi-document value; how it is deserialized is
//! delegated to an external collaborator"); here we pick `serde_json`, the
//! same way the teacher's `pallas-configs` crate turns Haskell-shaped JSON
//! config files into typed Rust documents.

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A fixed-width primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F16,
    F32,
    F64,
}

impl Primitive {
    /// Fixed byte length of this primitive (spec §3: "Primitive byte
    /// lengths are fixed").
    pub const fn byte_len(self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 => 1,
            Primitive::U16 | Primitive::I16 | Primitive::F16 => 2,
            Primitive::U32 | Primitive::I32 | Primitive::F32 => 4,
            Primitive::U64 | Primitive::I64 | Primitive::F64 => 8,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::U8 => "u8",
            Primitive::I8 => "i8",
            Primitive::U16 => "u16",
            Primitive::I16 => "i16",
            Primitive::U32 => "u32",
            Primitive::I32 => "i32",
            Primitive::U64 => "u64",
            Primitive::I64 => "i64",
            Primitive::F16 => "f16",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
        };
        f.write_str(s)
    }
}

/// Type attributes shared by every composite kind (spec §3: "attributes
/// (booleans packed, integer aligned)").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub packed: bool,
    #[serde(default)]
    pub aligned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDef {
    pub element: Box<TypeKind>,
    pub size: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub tag_value: BigInt,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub tag: Expr,
    pub variants: Vec<EnumVariant>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionVariant {
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionDef {
    pub variants: Vec<UnionVariant>,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDiscriminatedVariant {
    pub name: String,
    pub expected_size: usize,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDiscriminatedUnionDef {
    pub variants: Vec<SizeDiscriminatedVariant>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// A type-kind: the tagged sum from spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeKind {
    Primitive(Primitive),
    Struct(StructDef),
    Array(ArrayDef),
    Enum(EnumDef),
    Union(UnionDef),
    SizeDiscriminatedUnion(SizeDiscriminatedUnionDef),
    TypeRef(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
}

/// An ABI document: a mapping from unique, non-empty type name to
/// definition (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub types: Vec<TypeDef>,
}

impl Document {
    /// Parses a document from its external JSON representation.
    pub fn from_json(source: &str) -> Result<Self, crate::error::ThruAbiError> {
        let doc: Document =
            serde_json::from_str(source).map_err(|e| crate::error::ThruAbiError::Parse(e.to_string()))?;
        doc.validate_shape()?;
        Ok(doc)
    }

    fn validate_shape(&self) -> Result<(), crate::error::ThruAbiError> {
        let mut seen = std::collections::HashSet::new();
        for def in &self.types {
            if def.name.is_empty() {
                return Err(crate::error::ThruAbiError::Parse(
                    "type name must not be empty".into(),
                ));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(crate::error::ThruAbiError::Parse(format!(
                    "duplicate type name: {}",
                    def.name
                )));
            }
        }
        Ok(())
    }
}

/// A segment of a field-reference path (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Parent,
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LeftShift,
    RightShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    BitNot,
}

/// An expression (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Literal(BigInt),
    FieldRef(Vec<PathSegment>),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Sizeof(String),
    Alignof(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}
