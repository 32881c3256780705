//! ABI account container codec (spec §3/§4.5): a 45-byte header preceding
//! UTF-8 ABI document content.

use binary_layout::prelude::*;
use thru_codec::Hash;

use crate::error::WireError;

pub const HEADER_SIZE: usize = 45;

define_layout!(header_layout, LittleEndian, {
    meta_account_address: [u8; 32],
    revision: u64,
    state: u8,
    content_size: u32,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Open = 0,
    Finalized = 1,
}

impl AccountState {
    fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            0 => Ok(AccountState::Open),
            1 => Ok(AccountState::Finalized),
            other => Err(WireError::InvalidAccountState(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiAccountContainer {
    pub meta_account_address: Hash<32>,
    pub revision: u64,
    pub state: AccountState,
    pub content: String,
}

impl AbiAccountContainer {
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::InsufficientData {
                requested: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let view = header_layout::View::new(&bytes[..HEADER_SIZE]);
        let meta_account_address = Hash::new(*view.meta_account_address());
        let revision = view.revision().read();
        let state = AccountState::from_byte(view.state().read())?;
        let content_size = view.content_size().read() as usize;

        let remaining = bytes.len() - HEADER_SIZE;
        if content_size > remaining {
            return Err(WireError::ContentTooLarge {
                declared: content_size,
                remaining,
            });
        }

        let content_bytes = &bytes[HEADER_SIZE..HEADER_SIZE + content_size];
        let content = std::str::from_utf8(content_bytes)
            .map_err(|_| WireError::InvalidUtf8)?
            .to_string();

        Ok(AbiAccountContainer {
            meta_account_address,
            revision,
            state,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(address: [u8; 32], revision: u64, state: u8, content: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&address);
        bytes.extend_from_slice(&revision.to_le_bytes());
        bytes.push(state);
        bytes.extend_from_slice(&(content.len() as u32).to_le_bytes());
        bytes.extend_from_slice(content.as_bytes());
        bytes
    }

    #[test]
    fn parses_open_account() {
        let bytes = encode([7u8; 32], 3, 0, r#"{"types":[]}"#);
        let account = AbiAccountContainer::parse(&bytes).unwrap();
        assert_eq!(account.revision, 3);
        assert_eq!(account.state, AccountState::Open);
        assert_eq!(account.content, r#"{"types":[]}"#);
    }

    #[test]
    fn rejects_unknown_state() {
        let bytes = encode([0u8; 32], 0, 2, "");
        assert!(matches!(
            AbiAccountContainer::parse(&bytes),
            Err(WireError::InvalidAccountState(2))
        ));
    }

    #[test]
    fn rejects_content_size_exceeding_buffer() {
        let mut bytes = encode([0u8; 32], 0, 0, "hi");
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            AbiAccountContainer::parse(&bytes),
            Err(WireError::ContentTooLarge { .. })
        ));
    }
}
