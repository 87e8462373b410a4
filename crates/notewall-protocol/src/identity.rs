//! Visitor identity values: minting and canonical-format checks.

use rand::RngCore;
use uuid::{Builder, Uuid};

use crate::IDENTITY_LEN;

/// Mint a fresh identity value: 128 bits from the thread CSPRNG with UUID v4
/// version/variant bits, formatted lowercase and hyphenated.
pub fn mint_identity() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

/// True iff `value` is a lowercase hyphenated 8-4-4-4-12 hex string.
///
/// Other encodings of the same UUID (uppercase, braced, urn, simple) are
/// rejected so one identity has exactly one accepted spelling.
pub fn is_canonical_identity(value: &str) -> bool {
    value.len() == IDENTITY_LEN
        && Uuid::try_parse(value).is_ok_and(|id| id.hyphenated().to_string() == value)
}
