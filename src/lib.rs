//! # vaultprov
//!
//! Lifecycle management for generated secrets stored in HashiCorp Vault KV version 2.
//!
//! ## Architecture
//!
//! ```text
//! RandomSecretResource / KeypairSecretOrchestrator
//!                    ↓
//!               SecretStore  →  PathResolver (mount discovery, path rewriting)
//!                    ↓                ↓
//!               LogicalClient (HttpLogicalClient over reqwest)
//! ```
//!
//! Every secret is tagged with reserved custom metadata (`secret_type`, `secret_length`,
//! and for keypairs `keypair_linked_secret_path` and `keypair_part`) next to the user's
//! own metadata.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vaultprov::{Provider, ProviderConfig, RandomSecretModel, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ProviderConfig::load(None)?;
//!     let provider = Provider::configure(&config).await?;
//!
//!     let created = provider
//!         .random_secrets()
//!         .create(&RandomSecretModel::new("secret/app/signing-key"))
//!         .await?;
//!     println!("{}", created.path);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod provider;
pub mod resources;
pub mod secrets;
pub mod vault;

// Re-export commonly used types and traits
pub use config::ProviderConfig;
pub use errors::{Error, Result, Warning};
pub use provider::Provider;
pub use resources::{
    KeypairSecretModel, KeypairSecretOrchestrator, RandomSecretModel, RandomSecretResource,
};
pub use vault::{LogicalClient, PathResolver, SecretStore, VaultError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
