use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::constants::{ADDRESS_PREFIX, ADDRESS_TEXT_LENGTH};

// ==================== ADDRESS ====================

/// True for `0x` + 40 characters. Content is not inspected.
pub fn has_address_shape(text: &str) -> bool {
    text.len() == ADDRESS_TEXT_LENGTH && text.starts_with(ADDRESS_PREFIX)
}

/// Shape plus hex digits; mixed-case input must also carry a valid EIP-55 checksum.
pub fn is_valid_address(text: &str) -> bool {
    if !has_address_shape(text) {
        return false;
    }
    let digits = &text[ADDRESS_PREFIX.len()..];
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    if !(has_upper && has_lower) {
        return true;
    }
    match Address::from_str(text) {
        Ok(parsed) => to_checksum(&parsed, None) == text,
        Err(_) => false,
    }
}

/// Account identifier with case-insensitive equality. Keeps the caller's spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Accepts anything with the address shape.
    pub fn parse(text: &str) -> Option<Self> {
        has_address_shape(text).then(|| Self(text.to_string()))
    }

    /// Accepts only well-formed, checksum-consistent addresses.
    pub fn parse_strict(text: &str) -> Option<Self> {
        is_valid_address(text).then(|| Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for WalletAddress {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for WalletAddress {}

impl Hash for WalletAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==================== IDENTITY ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedWallet {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub wallet: Option<LinkedWallet>,
}

impl AuthUser {
    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet.as_ref().map(|w| w.address.as_str())
    }
}

/// Snapshot of the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub ready: bool,
    pub authenticated: bool,
    pub user: Option<AuthUser>,
}
