//! Strictly typed principal references: owners, oracles, contracts, vaults.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cryptographically addressed principal, stored as a hex string (for
/// key-derived identities) or an opaque label (for deployed components).
/// The empty string is the null identity, the equivalent of address 0x0.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Identity(id.into())
    }

    /// The null identity. Never a valid caller, owner or oracle.
    pub fn null() -> Self {
        Identity(String::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity of an ed25519 public key (hex encoded).
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Identity(hex::encode(key.to_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Identity(id.to_string())
    }
}
