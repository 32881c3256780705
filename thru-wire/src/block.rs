//! Block codec (spec §3/§4.5): a header (two supported layouts), a body of
//! concatenated transaction records, and an optional footer.

use binary_layout::prelude::*;
use thru_codec::Hash;

use crate::error::WireError;
use crate::transaction::{self, Pubkey, Signature, Transaction};

pub const CURRENT_HEADER_SIZE: usize = 168;
pub const LEGACY_HEADER_SIZE: usize = 160;
pub const FOOTER_SIZE: usize = 104;

define_layout!(current_header, LittleEndian, {
    signature: [u8; 64],
    version: u8,
    padding: [u8; 5],
    chain_id: u16,
    producer_pubkey: [u8; 32],
    bond_amount_lockup: u64,
    expiry_timestamp_ns: u64,
    start_slot: u64,
    expiry_after: u32,
    max_block_size: u32,
    max_compute_units: u64,
    max_state_units: u32,
    reserved: [u8; 4],
    weight_slot: u64,
    block_time_ns: u64,
});

// Drops `weight_slot`; every other field keeps the same padding as the
// current layout (spec §9, open question — see DESIGN.md for why we did
// not widen the padding here).
define_layout!(legacy_header, LittleEndian, {
    signature: [u8; 64],
    version: u8,
    padding: [u8; 5],
    chain_id: u16,
    producer_pubkey: [u8; 32],
    bond_amount_lockup: u64,
    expiry_timestamp_ns: u64,
    start_slot: u64,
    expiry_after: u32,
    max_block_size: u32,
    max_compute_units: u64,
    max_state_units: u32,
    reserved: [u8; 4],
    block_time_ns: u64,
});

define_layout!(footer_layout, LittleEndian, {
    attestor_payment: u64,
    block_hash: [u8; 32],
    block_signature: [u8; 64],
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub signature: Signature,
    pub version: u8,
    pub chain_id: u16,
    pub producer_pubkey: Pubkey,
    pub bond_amount_lockup: u64,
    pub expiry_timestamp_ns: u64,
    pub start_slot: u64,
    pub expiry_after: u32,
    pub max_block_size: u32,
    pub max_compute_units: u64,
    pub max_state_units: u32,
    /// Present only under the current (168-byte) layout.
    pub weight_slot: Option<u64>,
    pub block_time_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFooter {
    pub attestor_payment: u64,
    pub block_hash: Hash<32>,
    pub block_signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub footer: Option<BlockFooter>,
}

impl Block {
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        if let Some(block) = Self::try_layout(bytes, CURRENT_HEADER_SIZE, parse_current_header)? {
            return Ok(block);
        }
        if let Some(block) = Self::try_layout(bytes, LEGACY_HEADER_SIZE, parse_legacy_header)? {
            return Ok(block);
        }
        Err(WireError::NoHeaderLayout)
    }

    fn try_layout(
        bytes: &[u8],
        header_size: usize,
        parse_header: fn(&[u8]) -> Result<BlockHeader, WireError>,
    ) -> Result<Option<Self>, WireError> {
        if bytes.len() < header_size {
            return Ok(None);
        }
        let header = match parse_header(&bytes[..header_size]) {
            Ok(h) if h.version == transaction::VERSION => h,
            _ => return Ok(None),
        };

        let (body, footer) = split_body_and_footer(bytes, header_size);
        if !body.is_empty() && !looks_like_transactions(body) {
            return Ok(None);
        }

        let transactions = scan_transactions(body);
        let footer = footer.map(parse_footer).transpose()?;

        Ok(Some(Block {
            header,
            transactions,
            footer,
        }))
    }
}

fn split_body_and_footer(bytes: &[u8], header_size: usize) -> (&[u8], Option<&[u8]>) {
    let rest = &bytes[header_size..];
    if rest.len() >= FOOTER_SIZE {
        let split = rest.len() - FOOTER_SIZE;
        (&rest[..split], Some(&rest[split..]))
    } else {
        (rest, None)
    }
}

/// Cheap sanity check before committing to a header layout: reads the
/// candidate first transaction's account counts and instruction-data size
/// without fully parsing it (spec §4.5, "header-size guess").
fn looks_like_transactions(body: &[u8]) -> bool {
    const PROBE_SIZE: usize = 64 + 1 + 1 + 2 + 2 + 2; // signature+version+flags+3 counts
    if body.len() < PROBE_SIZE {
        return false;
    }
    let rw = u16::from_le_bytes([body[66], body[67]]) as usize;
    let ro = u16::from_le_bytes([body[68], body[69]]) as usize;
    let instr_size = u16::from_le_bytes([body[70], body[71]]) as usize;

    let total_accounts = rw + ro;
    if total_accounts > transaction::MAX_ACCOUNTS {
        return false;
    }

    let recomputed_min = transaction::MIN_SIZE + (rw + ro) * 32 + instr_size;
    recomputed_min <= body.len()
}

fn scan_transactions(body: &[u8]) -> Vec<Transaction> {
    let mut transactions = Vec::new();
    let mut offset = 0;
    while body.len() - offset >= transaction::MIN_SIZE {
        match Transaction::parse_lenient(&body[offset..]) {
            Ok((txn, consumed)) => {
                transactions.push(txn);
                offset += consumed;
            }
            Err(err) => {
                log::debug!("stopping block body scan at offset {offset}: {err}");
                break;
            }
        }
    }
    transactions
}

fn parse_current_header(bytes: &[u8]) -> Result<BlockHeader, WireError> {
    let view = current_header::View::new(bytes);
    Ok(BlockHeader {
        signature: Hash::new(*view.signature()),
        version: view.version().read(),
        chain_id: view.chain_id().read(),
        producer_pubkey: Hash::new(*view.producer_pubkey()),
        bond_amount_lockup: view.bond_amount_lockup().read(),
        expiry_timestamp_ns: view.expiry_timestamp_ns().read(),
        start_slot: view.start_slot().read(),
        expiry_after: view.expiry_after().read(),
        max_block_size: view.max_block_size().read(),
        max_compute_units: view.max_compute_units().read(),
        max_state_units: view.max_state_units().read(),
        weight_slot: Some(view.weight_slot().read()),
        block_time_ns: view.block_time_ns().read(),
    })
}

fn parse_legacy_header(bytes: &[u8]) -> Result<BlockHeader, WireError> {
    let view = legacy_header::View::new(bytes);
    Ok(BlockHeader {
        signature: Hash::new(*view.signature()),
        version: view.version().read(),
        chain_id: view.chain_id().read(),
        producer_pubkey: Hash::new(*view.producer_pubkey()),
        bond_amount_lockup: view.bond_amount_lockup().read(),
        expiry_timestamp_ns: view.expiry_timestamp_ns().read(),
        start_slot: view.start_slot().read(),
        expiry_after: view.expiry_after().read(),
        max_block_size: view.max_block_size().read(),
        max_compute_units: view.max_compute_units().read(),
        max_state_units: view.max_state_units().read(),
        weight_slot: None,
        block_time_ns: view.block_time_ns().read(),
    })
}

fn parse_footer(bytes: &[u8]) -> Result<BlockFooter, WireError> {
    let view = footer_layout::View::new(bytes);
    Ok(BlockFooter {
        attestor_payment: view.attestor_payment().read(),
        block_hash: Hash::new(*view.block_hash()),
        block_signature: Hash::new(*view.block_signature()),
    })
}

/// Serializes a current-layout block header, body, and footer, for use in
/// round-trip tests (spec §8, "Block round-trip").
pub fn serialize_current(header: &BlockHeader, transactions: &[Transaction], footer: &BlockFooter) -> Vec<u8> {
    let mut bytes = vec![0u8; CURRENT_HEADER_SIZE];
    {
        let mut view = current_header::View::new(&mut bytes[..]);
        *view.signature_mut() = *header.signature;
        view.version_mut().write(header.version);
        *view.padding_mut() = [0u8; 5];
        view.chain_id_mut().write(header.chain_id);
        *view.producer_pubkey_mut() = *header.producer_pubkey;
        view.bond_amount_lockup_mut().write(header.bond_amount_lockup);
        view.expiry_timestamp_ns_mut().write(header.expiry_timestamp_ns);
        view.start_slot_mut().write(header.start_slot);
        view.expiry_after_mut().write(header.expiry_after);
        view.max_block_size_mut().write(header.max_block_size);
        view.max_compute_units_mut().write(header.max_compute_units);
        view.max_state_units_mut().write(header.max_state_units);
        *view.reserved_mut() = [0u8; 4];
        view.weight_slot_mut().write(header.weight_slot.unwrap_or(0));
        view.block_time_ns_mut().write(header.block_time_ns);
    }

    for txn in transactions {
        bytes.extend_from_slice(&txn.serialize());
    }

    let mut footer_bytes = vec![0u8; FOOTER_SIZE];
    {
        let mut view = footer_layout::View::new(&mut footer_bytes[..]);
        view.attestor_payment_mut().write(footer.attestor_payment);
        *view.block_hash_mut() = *footer.block_hash;
        *view.block_signature_mut() = *footer.block_signature;
    }
    bytes.extend_from_slice(&footer_bytes);

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::VERSION;

    fn sample_txn() -> Transaction {
        Transaction {
            signature: Signature::new([1u8; 64]),
            version: VERSION,
            flags: 0,
            requested_compute: 1,
            requested_state: 1,
            requested_memory: 1,
            fee: 1,
            nonce: 1,
            start_slot: 1,
            expiry_after: 1,
            fee_payer_pubkey: Pubkey::new([2u8; 32]),
            program_pubkey: Pubkey::new([3u8; 32]),
            rw_accounts: vec![Pubkey::new([4u8; 32])],
            ro_accounts: vec![],
            instruction_data: vec![9, 9],
            fee_payer_state_proof: None,
            fee_payer_account_meta: None,
        }
    }

    fn sample_header() -> BlockHeader {
        BlockHeader {
            signature: Signature::new([5u8; 64]),
            version: VERSION,
            chain_id: 7,
            producer_pubkey: Pubkey::new([6u8; 32]),
            bond_amount_lockup: 100,
            expiry_timestamp_ns: 200,
            start_slot: 300,
            expiry_after: 400,
            max_block_size: 500,
            max_compute_units: 600,
            max_state_units: 700,
            weight_slot: Some(800),
            block_time_ns: 900,
        }
    }

    #[test]
    fn round_trips_current_layout_block() {
        let header = sample_header();
        let txn = sample_txn();
        let footer = BlockFooter {
            attestor_payment: 42,
            block_hash: Hash::new([8u8; 32]),
            block_signature: Signature::new([9u8; 64]),
        };

        let bytes = serialize_current(&header, &[txn.clone()], &footer);
        let block = Block::parse(&bytes).unwrap();

        assert_eq!(block.header, header);
        assert_eq!(block.transactions, vec![txn]);
        assert_eq!(block.footer.as_ref().unwrap().block_hash, footer.block_hash);
    }

    #[test]
    fn falls_back_to_legacy_layout_when_current_does_not_fit() {
        let mut bytes = vec![0u8; LEGACY_HEADER_SIZE];
        {
            let mut view = legacy_header::View::new(&mut bytes[..]);
            view.version_mut().write(VERSION);
        }
        let block = Block::parse(&bytes).unwrap();
        assert_eq!(block.header.weight_slot, None);
        assert!(block.transactions.is_empty());
        assert!(block.footer.is_none());
    }
}
