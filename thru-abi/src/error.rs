//! The three error kinds from spec §7, each carrying machine-readable
//! detail alongside a human message.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("type `{name}` referenced from `{context}` is not declared in the document")]
    UnknownTypeRef { name: String, context: String },

    #[error("type cycle detected: {path}")]
    Cycle { path: String },

    #[error("unknown type: `{0}`")]
    UnknownType(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("insufficient data at {path}: requested {requested} bytes, {remaining} remaining")]
    InsufficientData {
        path: String,
        requested: usize,
        remaining: usize,
    },

    #[error("expression evaluation failed at {path}: {message}")]
    ExpressionFailure { path: String, message: String },

    #[error("no union variant matched at {path}: {attempts:?}")]
    NoUnionMatch {
        path: String,
        attempts: Vec<(String, String)>,
    },

    #[error("multiple union variants matched at {path}: {winners:?}")]
    MultipleUnionMatch { path: String, winners: Vec<String> },

    #[error("did not consume full buffer at {path}: expected {expected}, consumed {consumed}, {remaining} bytes remaining")]
    TrailingBytes {
        path: String,
        expected: usize,
        consumed: usize,
        remaining: usize,
    },

    #[error("array length out of range at {path}: {length}")]
    ArrayLengthOutOfRange { path: String, length: String },

    #[error("unsupported primitive at {path}")]
    UnsupportedPrimitive { path: String },

    #[error("registry error while decoding: {0}")]
    Validation(#[from] ValidationError),
}

impl DecodeError {
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThruAbiError {
    #[error("failed to parse ABI document: {0}")]
    Parse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
