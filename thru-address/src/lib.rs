//! Textual address/signature encoding (`ta-`/`ts-` prefixed base-62) and ABI
//! account address derivation (spec §6).

mod derive;
mod error;
mod taencoding;

pub use derive::{derive_abi_account_address, derive_abi_account_address_from_ta, derive_address, ABI_ACCOUNT_BODY, ABI_ACCOUNT_KIND};
pub use error::AddressError;
pub use taencoding::{decode_ta, decode_ts, encode_ta, encode_ts, TA_LEN, TA_PREFIX, TS_LEN, TS_PREFIX};
