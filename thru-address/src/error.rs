use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address string has length {found}, expected {expected}")]
    WrongLength { expected: usize, found: usize },
    #[error("address string does not start with the expected prefix {expected:?}")]
    WrongPrefix { expected: &'static str },
    #[error("address string contains a character outside the ta-encoding alphabet: {0:?}")]
    InvalidCharacter(char),
    #[error("checksum mismatch: string encodes checksum digit {found}, payload hashes to {expected}")]
    ChecksumMismatch { expected: u8, found: u8 },
    #[error("decoded payload does not fit in {expected} bytes")]
    PayloadOverflow { expected: usize },
}
