//! Transaction codec (spec §3/§4.5). The fixed header is 112 bytes
//! (signature through the reserved padding); the fee-payer and program
//! pubkeys immediately follow as a further 64 fixed bytes, then the
//! dynamic sections begin at byte 176 — the minimum size a block scanner
//! requires to even attempt a transaction record.

use std::slice;

use binary_layout::prelude::*;
use thru_codec::Hash;

use crate::error::WireError;
use crate::state_proof::{ProofType, StateProof};

pub const VERSION: u8 = 1;
pub const HAS_FEE_PAYER_PROOF: u8 = 0x01;
pub const MAY_COMPRESS_ACCOUNT: u8 = 0x02;
const FLAG_MASK: u8 = HAS_FEE_PAYER_PROOF | MAY_COMPRESS_ACCOUNT;

pub const HEADER_SIZE: usize = 112;
pub const PUBKEYS_SIZE: usize = 64;
/// The smallest a well-formed transaction record can be: fixed header +
/// fee-payer/program pubkeys, with empty dynamic sections. Block parsing
/// uses this to decide when to stop scanning a body for more records.
pub const MIN_SIZE: usize = HEADER_SIZE + PUBKEYS_SIZE;
pub const MAX_ACCOUNTS: usize = 1024;
pub const ACCOUNT_META_SIZE: usize = 64;

pub type Pubkey = Hash<32>;
pub type Signature = Hash<64>;

define_layout!(fixed_prefix, LittleEndian, {
    signature: [u8; 64],
    version: u8,
    flags: u8,
    rw_accounts_cnt: u16,
    ro_accounts_cnt: u16,
    instruction_data_size: u16,
    requested_compute: u32,
    requested_state: u16,
    requested_memory: u16,
    fee: u64,
    nonce: u64,
    start_slot: u64,
    expiry_after: u32,
    reserved: [u8; 4],
    fee_payer_pubkey: [u8; 32],
    program_pubkey: [u8; 32],
});

/// Fixed 64-byte record describing an account's post-state, present only
/// alongside an `EXISTING`-type fee-payer proof (spec §3, "Transaction").
/// Its internal fields are opaque to the CORE; callers of the SDK
/// interpret the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta(pub [u8; ACCOUNT_META_SIZE]);

impl AccountMeta {
    fn parse(bytes: &[u8]) -> Result<(Self, usize), WireError> {
        if bytes.len() < ACCOUNT_META_SIZE {
            return Err(WireError::InsufficientData {
                requested: ACCOUNT_META_SIZE,
                found: bytes.len(),
            });
        }
        let mut buf = [0u8; ACCOUNT_META_SIZE];
        buf.copy_from_slice(&bytes[..ACCOUNT_META_SIZE]);
        Ok((AccountMeta(buf), ACCOUNT_META_SIZE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signature: Signature,
    pub version: u8,
    pub flags: u8,
    pub requested_compute: u32,
    pub requested_state: u16,
    pub requested_memory: u16,
    pub fee: u64,
    pub nonce: u64,
    pub start_slot: u64,
    pub expiry_after: u32,
    pub fee_payer_pubkey: Pubkey,
    pub program_pubkey: Pubkey,
    pub rw_accounts: Vec<Pubkey>,
    pub ro_accounts: Vec<Pubkey>,
    pub instruction_data: Vec<u8>,
    pub fee_payer_state_proof: Option<StateProof>,
    pub fee_payer_account_meta: Option<AccountMeta>,
}

impl Transaction {
    pub fn has_fee_payer_proof(&self) -> bool {
        self.flags & HAS_FEE_PAYER_PROOF != 0
    }

    pub fn may_compress_account(&self) -> bool {
        self.flags & MAY_COMPRESS_ACCOUNT != 0
    }

    pub fn is_unsigned(&self) -> bool {
        self.signature.is_zero()
    }

    pub fn expiry_slot(&self) -> u64 {
        self.start_slot.saturating_add(self.expiry_after as u64)
    }

    pub fn account_count(&self) -> usize {
        self.rw_accounts.len() + self.ro_accounts.len()
    }

    /// Iterates every account address in wire order: fee-payer, program,
    /// then the read-write and read-only sections (spec §3, "Transaction").
    pub fn accounts_iter(&self) -> AccountAddrsIter<'_> {
        AccountAddrsIter {
            fee_payer: Some(&self.fee_payer_pubkey),
            program: Some(&self.program_pubkey),
            rw_iter: self.rw_accounts.iter(),
            ro_iter: self.ro_accounts.iter(),
        }
    }

    /// `true` for the fee-payer (index 0) and every read-write account;
    /// `false` for the program (index 1) and read-only accounts.
    pub fn is_account_idx_writable(&self, idx: usize) -> bool {
        idx == 0 || (idx >= 2 && idx < 2 + self.rw_accounts.len())
    }

    /// Strict parse: validates version, flag bits, account-count cap, and
    /// that the supplied buffer holds no trailing bytes (spec §4.5).
    pub fn parse_strict(bytes: &[u8]) -> Result<Self, WireError> {
        let (txn, consumed) = Self::parse_inner(bytes, true)?;
        if consumed != bytes.len() {
            return Err(WireError::TrailingBytes {
                expected: consumed,
                found: bytes.len(),
            });
        }
        Ok(txn)
    }

    /// Lenient parse: accepts unknown versions/flags, skips the
    /// account-count cap, and returns the consumed size alongside the
    /// transaction so a block scanner can advance (spec §4.5, "parseWire").
    pub fn parse_lenient(bytes: &[u8]) -> Result<(Self, usize), WireError> {
        Self::parse_inner(bytes, false)
    }

    fn parse_inner(bytes: &[u8], strict: bool) -> Result<(Self, usize), WireError> {
        if bytes.len() < MIN_SIZE {
            return Err(WireError::InsufficientData {
                requested: MIN_SIZE,
                found: bytes.len(),
            });
        }

        let view = fixed_prefix::View::new(&bytes[..MIN_SIZE]);
        let version = view.version().read();
        let flags = view.flags().read();

        if strict {
            if version != VERSION {
                return Err(WireError::UnsupportedVersion(version));
            }
            if flags & !FLAG_MASK != 0 {
                return Err(WireError::InvalidFlags(flags));
            }
        }

        let rw_cnt = view.rw_accounts_cnt().read() as usize;
        let ro_cnt = view.ro_accounts_cnt().read() as usize;
        let instruction_data_size = view.instruction_data_size().read() as usize;

        if strict && rw_cnt + ro_cnt > MAX_ACCOUNTS {
            return Err(WireError::TooManyAccounts {
                count: rw_cnt + ro_cnt,
                max: MAX_ACCOUNTS,
            });
        }

        let signature = Hash::new(*view.signature());
        let fee_payer_pubkey = Hash::new(*view.fee_payer_pubkey());
        let program_pubkey = Hash::new(*view.program_pubkey());
        let requested_compute = view.requested_compute().read();
        let requested_state = view.requested_state().read();
        let requested_memory = view.requested_memory().read();
        let fee = view.fee().read();
        let nonce = view.nonce().read();
        let start_slot = view.start_slot().read();
        let expiry_after = view.expiry_after().read();

        let mut offset = MIN_SIZE;
        let rw_accounts = read_pubkeys(bytes, &mut offset, rw_cnt)?;
        let ro_accounts = read_pubkeys(bytes, &mut offset, ro_cnt)?;

        if bytes.len() < offset + instruction_data_size {
            return Err(WireError::InsufficientData {
                requested: offset + instruction_data_size,
                found: bytes.len(),
            });
        }
        let instruction_data = bytes[offset..offset + instruction_data_size].to_vec();
        offset += instruction_data_size;

        let mut fee_payer_state_proof = None;
        let mut fee_payer_account_meta = None;

        if flags & HAS_FEE_PAYER_PROOF != 0 {
            let (proof, consumed) = StateProof::parse(&bytes[offset..])?;
            offset += consumed;
            if proof.proof_type == ProofType::Existing {
                let (meta, consumed) = AccountMeta::parse(&bytes[offset..])?;
                offset += consumed;
                fee_payer_account_meta = Some(meta);
            }
            fee_payer_state_proof = Some(proof);
        }

        Ok((
            Transaction {
                signature,
                version,
                flags,
                requested_compute,
                requested_state,
                requested_memory,
                fee,
                nonce,
                start_slot,
                expiry_after,
                fee_payer_pubkey,
                program_pubkey,
                rw_accounts,
                ro_accounts,
                instruction_data,
                fee_payer_state_proof,
                fee_payer_account_meta,
            },
            offset,
        ))
    }

    /// Serializes a transaction byte-for-byte; `parse_strict(serialize(t))
    /// == t` for any well-formed, signed transaction (spec §3, §8).
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; MIN_SIZE];
        {
            let mut view = fixed_prefix::View::new(&mut bytes[..]);
            *view.signature_mut() = *self.signature;
            view.version_mut().write(self.version);
            view.flags_mut().write(self.flags);
            view.rw_accounts_cnt_mut().write(self.rw_accounts.len() as u16);
            view.ro_accounts_cnt_mut().write(self.ro_accounts.len() as u16);
            view.instruction_data_size_mut()
                .write(self.instruction_data.len() as u16);
            view.requested_compute_mut().write(self.requested_compute);
            view.requested_state_mut().write(self.requested_state);
            view.requested_memory_mut().write(self.requested_memory);
            view.fee_mut().write(self.fee);
            view.nonce_mut().write(self.nonce);
            view.start_slot_mut().write(self.start_slot);
            view.expiry_after_mut().write(self.expiry_after);
            *view.reserved_mut() = [0u8; 4];
            *view.fee_payer_pubkey_mut() = *self.fee_payer_pubkey;
            *view.program_pubkey_mut() = *self.program_pubkey;
        }

        for pk in self.rw_accounts.iter().chain(self.ro_accounts.iter()) {
            bytes.extend_from_slice(pk.as_ref());
        }
        bytes.extend_from_slice(&self.instruction_data);

        // A serialized proof/meta pair round-trips only through their own
        // parsed representation; we re-emit their header fields rather
        // than retaining original bytes, matching the codec's "pure
        // function over structured fields" contract.
        if let Some(proof) = &self.fee_payer_state_proof {
            bytes.extend_from_slice(&serialize_proof(proof));
            if let Some(meta) = &self.fee_payer_account_meta {
                bytes.extend_from_slice(&meta.0);
            }
        }

        bytes
    }
}

fn serialize_proof(proof: &StateProof) -> Vec<u8> {
    let tag = proof.proof_type as u64;
    let packed = (tag << 62) | proof.target_slot;
    let mut bytes = Vec::with_capacity(proof.footprint());
    bytes.extend_from_slice(&packed.to_le_bytes());
    bytes.extend_from_slice(&proof.path_bitset);
    for hash in &proof.hashes {
        bytes.extend_from_slice(hash.as_ref());
    }
    bytes
}

fn read_pubkeys(bytes: &[u8], offset: &mut usize, count: usize) -> Result<Vec<Pubkey>, WireError> {
    const PUBKEY_SIZE: usize = 32;
    let needed = count * PUBKEY_SIZE;
    if bytes.len() < *offset + needed {
        return Err(WireError::InsufficientData {
            requested: *offset + needed,
            found: bytes.len(),
        });
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(Hash::from_slice(&bytes[*offset..*offset + PUBKEY_SIZE])?);
        *offset += PUBKEY_SIZE;
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountAddr<'a> {
    FeePayer(&'a Pubkey),
    Program(&'a Pubkey),
    ReadWrite(&'a Pubkey),
    ReadOnly(&'a Pubkey),
}

pub struct AccountAddrsIter<'a> {
    fee_payer: Option<&'a Pubkey>,
    program: Option<&'a Pubkey>,
    rw_iter: slice::Iter<'a, Pubkey>,
    ro_iter: slice::Iter<'a, Pubkey>,
}

impl<'a> Iterator for AccountAddrsIter<'a> {
    type Item = AccountAddr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pk) = self.fee_payer.take() {
            return Some(AccountAddr::FeePayer(pk));
        }
        if let Some(pk) = self.program.take() {
            return Some(AccountAddr::Program(pk));
        }
        if let Some(pk) = self.rw_iter.next() {
            return Some(AccountAddr::ReadWrite(pk));
        }
        self.ro_iter.next().map(AccountAddr::ReadOnly)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let extra = self.fee_payer.is_some() as usize + self.program.is_some() as usize;
        let remaining = extra + self.rw_iter.len() + self.ro_iter.len();
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for AccountAddrsIter<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rw: usize, ro: usize, instr: &[u8]) -> Transaction {
        Transaction {
            signature: Signature::zeroed(),
            version: VERSION,
            flags: 0,
            requested_compute: 100,
            requested_state: 1,
            requested_memory: 2,
            fee: 10,
            nonce: 5,
            start_slot: 1000,
            expiry_after: 50,
            fee_payer_pubkey: Pubkey::new([1u8; 32]),
            program_pubkey: Pubkey::new([2u8; 32]),
            rw_accounts: (0..rw).map(|i| Pubkey::new([i as u8; 32])).collect(),
            ro_accounts: (0..ro).map(|i| Pubkey::new([(100 + i) as u8; 32])).collect(),
            instruction_data: instr.to_vec(),
            fee_payer_state_proof: None,
            fee_payer_account_meta: None,
        }
    }

    #[test]
    fn round_trips_without_proof() {
        let txn = sample(2, 1, &[0xAA, 0xBB]);
        let bytes = txn.serialize();
        let parsed = Transaction::parse_strict(&bytes).unwrap();
        assert_eq!(parsed, txn);
    }

    #[test]
    fn round_trips_with_existing_proof_and_meta() {
        let mut txn = sample(1, 0, &[]);
        txn.flags = HAS_FEE_PAYER_PROOF;
        txn.fee_payer_state_proof = Some(StateProof {
            proof_type: ProofType::Existing,
            target_slot: 77,
            path_bitset: [0u8; 32],
            hashes: vec![],
        });
        txn.fee_payer_account_meta = Some(AccountMeta([9u8; ACCOUNT_META_SIZE]));

        let bytes = txn.serialize();
        let parsed = Transaction::parse_strict(&bytes).unwrap();
        assert_eq!(parsed, txn);
    }

    #[test]
    fn unsigned_is_detected_by_zero_signature() {
        let txn = sample(0, 0, &[]);
        assert!(txn.is_unsigned());
    }

    #[test]
    fn strict_rejects_unknown_version() {
        let mut txn = sample(0, 0, &[]);
        txn.version = 2;
        let bytes = txn.serialize();
        assert!(matches!(
            Transaction::parse_strict(&bytes),
            Err(WireError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn strict_rejects_unrecognized_flag_bits() {
        let mut txn = sample(0, 0, &[]);
        txn.flags = 0x80;
        let bytes = txn.serialize();
        assert!(matches!(
            Transaction::parse_strict(&bytes),
            Err(WireError::InvalidFlags(0x80))
        ));
    }

    #[test]
    fn lenient_parse_tolerates_unknown_version_and_returns_consumed_size() {
        let mut txn = sample(0, 0, &[1, 2, 3]);
        txn.version = 9;
        let bytes = txn.serialize();
        let (parsed, consumed) = Transaction::parse_lenient(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed.instruction_data, vec![1, 2, 3]);
    }

    #[test]
    fn accounts_iter_orders_fee_payer_program_then_rw_then_ro() {
        let txn = sample(1, 1, &[]);
        let addrs: Vec<_> = txn.accounts_iter().collect();
        assert!(matches!(addrs[0], AccountAddr::FeePayer(_)));
        assert!(matches!(addrs[1], AccountAddr::Program(_)));
        assert!(matches!(addrs[2], AccountAddr::ReadWrite(_)));
        assert!(matches!(addrs[3], AccountAddr::ReadOnly(_)));
        assert_eq!(addrs.len(), 4);
    }

    #[test]
    fn writability_follows_fee_payer_rw_ro_layout() {
        let txn = sample(2, 1, &[]);
        assert!(txn.is_account_idx_writable(0)); // fee-payer
        assert!(!txn.is_account_idx_writable(1)); // program
        assert!(txn.is_account_idx_writable(2)); // rw #0
        assert!(txn.is_account_idx_writable(3)); // rw #1
        assert!(!txn.is_account_idx_writable(4)); // ro #0
    }
}
