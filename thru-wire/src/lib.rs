//! Wire-level codecs for on-chain objects: transactions, blocks, state
//! proofs and ABI account containers. Every format here is fixed-layout
//! binary, unlike `thru-abi`'s schema-driven decoder.

pub mod abi_account;
pub mod block;
pub mod error;
pub mod state_proof;
pub mod transaction;

pub use abi_account::AbiAccountContainer;
pub use block::{Block, BlockFooter, BlockHeader};
pub use error::WireError;
pub use state_proof::{ProofType, StateProof};
pub use transaction::{AccountAddr, AccountMeta, Transaction};
