//! # Managed secret resources
//!
//! Create, read, update, delete and import for the two kinds of secret this crate manages:
//! - [`RandomSecretResource`]: random bytes at a single path
//! - [`KeypairSecretOrchestrator`]: an X25519 keypair stored as two linked secrets
//!
//! Both write the generated value base64 encoded under [`SECRET_DATA_KEY`] and tag the
//! secret with reserved custom metadata keys next to the user's own.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::Error;
use crate::secrets::SecretBytes;

pub mod keypair;
pub mod random;

pub use keypair::{keypair_paths, KeypairSecretModel, KeypairSecretOrchestrator};
pub use random::{RandomSecretModel, RandomSecretResource};

/// Data key holding the base64 encoded secret value
pub const SECRET_DATA_KEY: &str = "secret";

pub const SECRET_TYPE_METADATA: &str = "secret_type";
pub const SECRET_LENGTH_METADATA: &str = "secret_length";
pub const KEYPAIR_LINKED_SECRET_METADATA: &str = "keypair_linked_secret_path";
pub const KEYPAIR_PART_METADATA: &str = "keypair_part";

/// Custom metadata keys set by this crate. Users can't own them.
pub const RESERVED_METADATA_KEYS: [&str; 4] = [
    SECRET_TYPE_METADATA,
    SECRET_LENGTH_METADATA,
    KEYPAIR_LINKED_SECRET_METADATA,
    KEYPAIR_PART_METADATA,
];

/// Value of the `secret_type` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretType {
    RandomSecret,
    Curve25519Keypair,
    Curve25519,
}

impl SecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RandomSecret => "random_secret",
            Self::Curve25519Keypair => "curve25519_keypair",
            Self::Curve25519 => "curve25519",
        }
    }
}

impl FromStr for SecretType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random_secret" => Ok(Self::RandomSecret),
            "curve25519_keypair" => Ok(Self::Curve25519Keypair),
            "curve25519" => Ok(Self::Curve25519),
            _ => Err(Error::validation(format!(
                "unknown secret type '{}', expected one of: random_secret, curve25519_keypair, curve25519",
                s
            ))),
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of a keypair a secret holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypairPart {
    Private,
    Public,
}

impl KeypairPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for KeypairPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_reserved_metadata_key(key: &str) -> bool {
    RESERVED_METADATA_KEYS.contains(&key)
}

/// Stored custom metadata minus the reserved keys.
pub fn user_metadata(stored: &HashMap<String, String>) -> HashMap<String, String> {
    stored
        .iter()
        .filter(|(key, _)| !is_reserved_metadata_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Reject user metadata that tries to set a reserved key.
pub fn check_user_metadata(metadata: &HashMap<String, String>) -> Result<(), Error> {
    let mut reserved: Vec<&str> =
        metadata.keys().map(String::as_str).filter(|key| is_reserved_metadata_key(key)).collect();
    if reserved.is_empty() {
        return Ok(());
    }
    reserved.sort_unstable();
    Err(Error::validation(format!(
        "metadata keys {} are reserved and can't be set",
        reserved.join(", ")
    )))
}

/// Data payload written for a generated value: `{"secret": "<base64>"}`.
pub fn secret_data(value: &SecretBytes) -> HashMap<String, Value> {
    HashMap::from([(
        SECRET_DATA_KEY.to_string(),
        Value::String(value.to_base64().expose_secret().to_string()),
    )])
}
