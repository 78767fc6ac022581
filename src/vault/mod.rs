//! # Vault KV v2 access
//!
//! Layers, bottom to top:
//! - [`LogicalClient`]: the four verbs the rest of the crate needs from Vault
//! - [`PathResolver`]: mount discovery and `data/`, `metadata/`, `delete/` path rewriting
//! - [`SecretStore`]: create, read, metadata update and soft delete of single secrets

pub mod auth;
pub mod error;
pub mod http;
pub mod path;
pub mod store;
pub mod transport;
pub mod wire;

pub use auth::{kubernetes_login, login_mount, KubernetesLogin};
pub use error::{TransportError, VaultError};
pub use http::{HttpLogicalClient, RequestOptions};
pub use path::{
    add_prefix_to_kv_path, normalize_path, strip_api_segment, ApiSegment, KvVersion, Mount,
    PathResolver, ResolvedPath,
};
pub use store::{Secret, SecretStore};
pub use transport::{LogicalClient, LogicalResponse};
pub use wire::{VersionMetadata, VersionState, CUSTOM_METADATA_FIELD, SECRET_DATA_FIELD};
