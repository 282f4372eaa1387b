// src/address.rs

use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ADDRESS_HEX_LEN: usize = 40;

/// Why a string was rejected as an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("expected 40 hex characters, got {0}")]
    WrongLength(usize),
    #[error("non-hex character {character:?} at position {position}")]
    NonHex { position: usize, character: char },
    #[error("checksum mismatch, expected {expected}")]
    BadChecksum { expected: String },
}

/// An EVM address that has passed validation.
///
/// Equality, hashing and ordering work on the 20 raw bytes, so two spellings of
/// the same address are always the same key. `Display` and `Serialize` emit the
/// EIP-55 checksummed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChecksumAddress(Address);

impl ChecksumAddress {
    /// Validates and normalizes a raw address string. See [`validate`].
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        validate(raw)
    }

    pub fn as_address(&self) -> Address {
        self.0
    }

    /// EIP-55 checksummed representation (`0x`-prefixed).
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0, None)
    }
}

impl From<Address> for ChecksumAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<ChecksumAddress> for Address {
    fn from(address: ChecksumAddress) -> Self {
        address.0
    }
}

impl FromStr for ChecksumAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

impl fmt::Display for ChecksumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for ChecksumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChecksumAddress({})", self.to_checksum())
    }
}

impl Serialize for ChecksumAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for ChecksumAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        validate(&raw).map_err(serde::de::Error::custom)
    }
}

/// Checks that `raw` is a 20-byte hex address and returns its canonical form.
///
/// The `0x` prefix is optional. Single-case input (all lower or all upper) is
/// accepted as is; mixed-case input is treated as an EIP-55 checksum and must
/// match exactly.
pub fn validate(raw: &str) -> Result<ChecksumAddress, AddressError> {
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);

    if hex_part.len() != ADDRESS_HEX_LEN {
        return Err(AddressError::WrongLength(hex_part.len()));
    }

    if let Some((position, character)) = hex_part
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii_hexdigit())
    {
        return Err(AddressError::NonHex {
            position,
            character,
        });
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(hex_part, &mut bytes).map_err(|_| AddressError::WrongLength(hex_part.len()))?;
    let address = ChecksumAddress(Address::from(bytes));

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = address.to_checksum();
        if expected[2..] != *hex_part {
            return Err(AddressError::BadChecksum { expected });
        }
    }

    Ok(address)
}

/// Returns the checksummed string for `raw`. Idempotent.
pub fn normalize(raw: &str) -> Result<String, AddressError> {
    validate(raw).map(|address| address.to_checksum())
}
