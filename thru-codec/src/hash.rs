use std::{fmt, ops::Deref, str::FromStr};

use crate::CodecError;

/// A fixed-size byte array, used for public keys, signatures and hashes
/// that appear in the wire formats.
///
/// Possible values in this SDK are 32 bytes long (pubkeys, block hashes,
/// state-proof path entries) or 64 bytes long (ed25519 signatures).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

impl<const BYTES: usize> Hash<BYTES> {
    #[inline]
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn from_slice(slice: &[u8]) -> Result<Self, CodecError> {
        if slice.len() != BYTES {
            return Err(CodecError::WrongLength {
                expected: BYTES,
                found: slice.len(),
            });
        }
        let mut bytes = [0u8; BYTES];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// True when every byte is zero, used to detect an "unsigned"
    /// transaction (spec §3: "a zero-filled signature prefix denotes
    /// unsigned").
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    #[inline]
    pub const fn zeroed() -> Self {
        Self([0u8; BYTES])
    }
}

impl<const BYTES: usize> Default for Hash<BYTES> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    #[inline]
    fn from(bytes: [u8; BYTES]) -> Self {
        Self::new(bytes)
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> PartialEq<[u8]> for Hash<BYTES> {
    fn eq(&self, other: &[u8]) -> bool {
        self.0.eq(other)
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{BYTES}>"))
            .field(&hex::encode(self))
            .finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| CodecError::BadHex)?;
        Ok(Self::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_roundtrip() {
        let digest: Hash<32> =
            "0d8d00cdd4657ac84d82f0a56067634a7adfdf43da41cb534bcaa45060973d21"
                .parse()
                .unwrap();
        assert_eq!(digest.to_string(), "0d8d00cdd4657ac84d82f0a56067634a7adfdf43da41cb534bcaa45060973d21");
    }

    #[test]
    fn from_str_bad_length() {
        let err: Result<Hash<32>, _> = "0d8d00".parse();
        assert!(err.is_err());
    }

    #[test]
    fn zero_detection() {
        assert!(Hash::<64>::zeroed().is_zero());
        let mut bytes = [0u8; 64];
        bytes[10] = 1;
        assert!(!Hash::new(bytes).is_zero());
    }
}
