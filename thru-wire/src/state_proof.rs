//! State-proof codec (spec §3/§4.5): a 40-byte header (packed proof-type +
//! target-slot, plus a path bitset) followed by a computed number of
//! 32-byte hashes.

use binary_layout::prelude::*;
use thru_codec::read::popcount;
use thru_codec::Hash;

use crate::error::WireError;

pub const HEADER_SIZE: usize = 40;
const HASH_SIZE: usize = 32;

define_layout!(header_layout, LittleEndian, {
    type_and_slot: u64,
    path_bitset: [u8; 32],
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofType {
    Existing = 0,
    Updating = 1,
    Creation = 2,
}

impl ProofType {
    fn from_tag(tag: u64) -> Result<Self, WireError> {
        match tag {
            0 => Ok(ProofType::Existing),
            1 => Ok(ProofType::Updating),
            2 => Ok(ProofType::Creation),
            other => Err(WireError::InvalidProofType(other as u8)),
        }
    }

    /// The number of extra 32-byte hashes this proof type always
    /// contributes on top of the path bitset's population count (spec
    /// §3/§4.5).
    fn extra_hashes(self) -> u64 {
        self as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateProof {
    pub proof_type: ProofType,
    pub target_slot: u64,
    pub path_bitset: [u8; 32],
    pub hashes: Vec<Hash<32>>,
}

impl StateProof {
    /// Total byte footprint: `40 + 32 * (popcount(bitset) + proof-type)`
    /// (spec §8, "State-proof sizing").
    pub fn footprint(&self) -> usize {
        HEADER_SIZE + self.hashes.len() * HASH_SIZE
    }

    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), WireError> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::InsufficientData {
                requested: HEADER_SIZE,
                found: bytes.len(),
            });
        }

        let view = header_layout::View::new(&bytes[..HEADER_SIZE]);
        let type_and_slot = view.type_and_slot().read();
        let path_bitset = *view.path_bitset();

        // Top two bits carry the proof type; the remaining 62 bits are the
        // target slot (spec §3, "State proof").
        let proof_type = ProofType::from_tag(type_and_slot >> 62)?;
        let target_slot = type_and_slot & ((1u64 << 62) - 1);

        let hash_count = popcount(&path_bitset) as u64 + proof_type.extra_hashes();
        let footprint = HEADER_SIZE + (hash_count as usize) * HASH_SIZE;

        if bytes.len() < footprint {
            return Err(WireError::InsufficientData {
                requested: footprint,
                found: bytes.len(),
            });
        }

        let mut hashes = Vec::with_capacity(hash_count as usize);
        let mut offset = HEADER_SIZE;
        for _ in 0..hash_count {
            hashes.push(Hash::from_slice(&bytes[offset..offset + HASH_SIZE])?);
            offset += HASH_SIZE;
        }

        Ok((
            StateProof {
                proof_type,
                target_slot,
                path_bitset,
                hashes,
            },
            footprint,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(tag: u64, slot: u64, bitset: [u8; 32]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        let packed = (tag << 62) | slot;
        bytes[..8].copy_from_slice(&packed.to_le_bytes());
        bytes[8..].copy_from_slice(&bitset);
        bytes
    }

    #[test]
    fn existing_proof_with_empty_bitset_has_no_hashes() {
        let bytes = header(0, 42, [0u8; 32]);
        let (proof, footprint) = StateProof::parse(&bytes).unwrap();
        assert_eq!(proof.proof_type, ProofType::Existing);
        assert_eq!(proof.target_slot, 42);
        assert_eq!(footprint, HEADER_SIZE);
        assert!(proof.hashes.is_empty());
    }

    #[test]
    fn creation_proof_requires_two_hashes_even_with_empty_bitset() {
        let mut bytes = header(2, 7, [0u8; 32]);
        bytes.extend(vec![0xAB; 64]);
        let (proof, footprint) = StateProof::parse(&bytes).unwrap();
        assert_eq!(proof.hashes.len(), 2);
        assert_eq!(footprint, HEADER_SIZE + 64);
    }

    #[test]
    fn updating_proof_adds_popcount_hashes() {
        let mut bitset = [0u8; 32];
        bitset[0] = 0b0000_0011; // two set bits
        let mut bytes = header(1, 0, bitset);
        bytes.extend(vec![0u8; 32 * 3]); // popcount(2) + updating(1) = 3
        let (proof, footprint) = StateProof::parse(&bytes).unwrap();
        assert_eq!(proof.hashes.len(), 3);
        assert_eq!(footprint, HEADER_SIZE + 3 * HASH_SIZE);
    }

    #[test]
    fn truncated_header_fails() {
        let bytes = vec![0u8; 10];
        assert!(StateProof::parse(&bytes).is_err());
    }
}
