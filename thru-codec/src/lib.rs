//! Shared byte-oriented primitives used by the ABI decoder and the wire
//! codecs: a fixed-size byte array newtype and a handful of little-endian
//! read helpers over in-memory slices.

mod hash;
pub mod read;

pub use hash::Hash;

/// Re-export of the arbitrary-precision integer type used throughout the
/// ABI expression evaluator, since 64-bit values exceed a 53-bit mantissa
/// and must not be silently truncated (spec: "Primitive numeric widths").
pub use num_bigint::BigInt;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("invalid hex value")]
    BadHex,
}
