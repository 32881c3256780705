//! Rust-native building blocks for the Thru SDK's decoding core.
//!
//! This crate doesn't provide any particular application; it re-exports the
//! lower-level `thru-*` crates under a single namespace for consumers who
//! want the whole decoding stack (schema-driven ABI decoding, wire codecs,
//! and address handling) without pinning each crate individually.

#[doc(inline)]
pub use thru_codec as codec;

pub mod abi {
    //! Schema-driven binary ABI decoding (type registry, layout engine,
    //! expression evaluator, speculative decoder).

    #[doc(inline)]
    pub use thru_abi::*;
}

pub mod wire {
    //! Fixed-layout wire codecs for transactions, blocks, state proofs, and
    //! ABI account containers.

    #[doc(inline)]
    pub use thru_wire::*;
}

pub mod address {
    //! `ta-`/`ts-`-prefixed textual encoding and ABI account address
    //! derivation.

    #[doc(inline)]
    pub use thru_address::*;
}
