//! Generation of random secrets and X25519 keypairs from the OS CSPRNG.

use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use super::types::SecretBytes;
use crate::errors::{Error, Result};

/// Length in bytes of random secrets when none is configured.
pub const DEFAULT_RANDOM_SECRET_LENGTH: usize = 32;

/// Length in bytes of both halves of a Curve25519 keypair.
pub const CURVE25519_KEY_LENGTH: usize = 32;

/// Fill `length` bytes from the operating system's random source.
pub fn generate_random_secret(length: usize) -> Result<SecretBytes> {
    if length == 0 {
        return Err(Error::generation("secret length must be at least 1 byte"));
    }

    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::generation(format!("failed to read random bytes: {}", e)))?;
    Ok(SecretBytes::new(bytes))
}

/// An X25519 keypair. The private half is redacted and zeroed on drop.
#[derive(Debug, Clone)]
pub struct Curve25519Keypair {
    pub private: SecretBytes,
    pub public: [u8; CURVE25519_KEY_LENGTH],
}

impl Curve25519Keypair {
    pub fn public_bytes(&self) -> SecretBytes {
        SecretBytes::from(self.public)
    }
}

pub fn generate_curve25519_keypair() -> Curve25519Keypair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    Curve25519Keypair { private: SecretBytes::from(secret.to_bytes()), public: public.to_bytes() }
}
