//! Wire-codec errors. Separate from `thru-abi`'s `DecodeError` since these
//! formats are fixed-layout, not schema-driven (spec §7 covers the
//! schema-driven decoder; these are the companion "decode-error" shapes for
//! C5).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("insufficient data: requested {requested} bytes, found {found}")]
    InsufficientData { requested: usize, found: usize },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("unrecognized flag bits: {0:#04x}")]
    InvalidFlags(u8),

    #[error("account count {count} exceeds the maximum of {max}")]
    TooManyAccounts { count: usize, max: usize },

    #[error("trailing bytes after the computed end: expected {expected}, found {found}")]
    TrailingBytes { expected: usize, found: usize },

    #[error("no block header layout matched")]
    NoHeaderLayout,

    #[error("invalid proof type: {0}")]
    InvalidProofType(u8),

    #[error("invalid account container state: {0}")]
    InvalidAccountState(u8),

    #[error("declared content size {declared} exceeds remaining buffer of {remaining}")]
    ContentTooLarge { declared: usize, remaining: usize },

    #[error("account content is not valid UTF-8")]
    InvalidUtf8,

    #[error(transparent)]
    Codec(#[from] thru_codec::CodecError),
}
