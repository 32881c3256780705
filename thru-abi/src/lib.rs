//! Schema-driven binary ABI decoder.
//!
//! An ABI document describes a set of named types; this crate turns that
//! document into a validated, cycle-checked [`Registry`] and then decodes
//! raw bytes against a named type in that registry, producing a
//! [`DecodedValue`] tree annotated with byte offsets for error reporting.

mod decoder;
mod document;
mod error;
mod expr;
mod layout;
mod path;
mod registry;
mod scope;
mod value;

pub use decoder::{decode, decode_with_limits, DecodeLimits};
pub use document::{
    ArrayDef, Attributes, BinaryExpr, BinaryOp, Document, EnumDef, EnumVariant, Expr, FieldDef,
    PathSegment, Primitive, StructDef, TypeDef, TypeKind, UnaryExpr, UnaryOp, UnionDef,
    UnionVariant, SizeDiscriminatedUnionDef, SizeDiscriminatedVariant,
};
pub use error::{DecodeError, ThruAbiError, ValidationError};
pub use path::DecodePath;
pub use registry::Registry;
pub use value::{DecodedKind, DecodedValue, PrimitiveValue, UnionAttempt};
