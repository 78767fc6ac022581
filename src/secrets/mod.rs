//! Secret material handling.
//!
//! - [`SecretString`] and [`SecretBytes`] keep tokens and generated keys out of logs,
//!   debug output and serialized state.
//! - [`generate_random_secret`] and [`generate_curve25519_keypair`] produce the values the
//!   resources store in Vault.

pub mod generate;
pub mod types;

pub use generate::{
    generate_curve25519_keypair, generate_random_secret, Curve25519Keypair,
    CURVE25519_KEY_LENGTH, DEFAULT_RANDOM_SECRET_LENGTH,
};
pub use types::{SecretBytes, SecretString};
