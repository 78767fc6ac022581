//! Lifecycle of a single KV v2 secret: data plus custom metadata.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn, Instrument};

use super::error::{Result, VaultError};
use super::path::{PathResolver, ResolvedPath};
use super::transport::LogicalClient;
use super::wire::{
    custom_metadata, required_field, response_data, VersionMetadata, VersionState,
    CUSTOM_METADATA_FIELD, SECRET_DATA_FIELD,
};
use crate::vault_span;

const READ_DATA: &str = "read secret's data";
const WRITE_DATA: &str = "write secret's data";
const READ_METADATA: &str = "read secret's metadata";
const WRITE_METADATA: &str = "write secret's metadata";
const DELETE_VERSIONS: &str = "mark secret's versions as deleted";

/// A stored secret as seen by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Secret {
    /// Normalized logical path
    pub path: String,
    pub data: HashMap<String, Value>,
    pub metadata: HashMap<String, String>,
}

/// CRUD over KV v2 secrets, always going through [`PathResolver`].
pub struct SecretStore<C> {
    resolver: Arc<PathResolver<C>>,
}

impl<C> Clone for SecretStore<C> {
    fn clone(&self) -> Self {
        Self { resolver: Arc::clone(&self.resolver) }
    }
}

impl<C: LogicalClient> SecretStore<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_resolver(PathResolver::new(client))
    }

    pub fn with_resolver(resolver: PathResolver<C>) -> Self {
        Self { resolver: Arc::new(resolver) }
    }

    pub fn resolver(&self) -> &PathResolver<C> {
        &self.resolver
    }

    fn client(&self) -> &C {
        self.resolver.client()
    }

    /// Create a secret. Fails if anything already exists at the data path.
    ///
    /// The data and metadata writes are not atomic: if the metadata write fails, the data
    /// stays behind without custom metadata and the metadata write error is returned.
    pub async fn create(
        &self,
        path: &str,
        data: HashMap<String, Value>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let span = vault_span!("create", path);
        async move {
            let resolved = self.resolver.resolve(path).await?;
            let data_path = resolved.data_path();

            let existing = self.client().read(&data_path).await.map_err(VaultError::request(READ_DATA))?;
            if existing.is_some() {
                return Err(VaultError::AlreadyExists { path: resolved.logical });
            }

            self.client()
                .write(&data_path, &json!({ SECRET_DATA_FIELD: data }))
                .await
                .map_err(VaultError::request(WRITE_DATA))?;

            self.write_custom_metadata(&resolved, metadata).await?;
            debug!(path = %resolved.logical, "Created secret");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Read a secret. `Ok(None)` means nothing exists at the path.
    pub async fn read(&self, path: &str) -> Result<Option<Secret>> {
        let span = vault_span!("read", path);
        async move {
            let resolved = self.resolver.resolve(path).await?;

            let Some(response) =
                self.client().read(&resolved.data_path()).await.map_err(VaultError::request(READ_DATA))?
            else {
                debug!(path = %resolved.logical, "Secret not found");
                return Ok(None);
            };

            let body = response_data(&response, READ_DATA)?;
            let version = required_field::<VersionMetadata>(body, "metadata", READ_DATA)?;
            if version.is_deleted() {
                warn!(path = %resolved.logical, version = version.version, "Latest version of secret is deleted");
                return Err(VaultError::SecretDeleted { path: resolved.logical, version: version.version });
            }
            let data = required_field::<HashMap<String, Value>>(body, SECRET_DATA_FIELD, READ_DATA)?;

            let metadata = self.read_custom_metadata(&resolved).await?;
            Ok(Some(Secret { path: resolved.logical, data, metadata }))
        }
        .instrument(span)
        .await
    }

    /// Replace a secret's custom metadata. The secret must already carry custom metadata.
    pub async fn update_metadata(&self, path: &str, metadata: HashMap<String, String>) -> Result<()> {
        let span = vault_span!("update_metadata", path);
        async move {
            let resolved = self.resolver.resolve(path).await?;
            self.read_custom_metadata(&resolved).await?;
            self.write_custom_metadata(&resolved, metadata).await?;
            debug!(path = %resolved.logical, "Updated secret metadata");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Soft-delete every active version of a secret and return the deleted version numbers.
    ///
    /// Versions stay recoverable with an undelete; no call is made when nothing is active.
    pub async fn delete(&self, path: &str) -> Result<Vec<u64>> {
        let span = vault_span!("delete", path);
        async move {
            let resolved = self.resolver.resolve(path).await?;
            let body = self.read_metadata_body(&resolved).await?;

            let states =
                required_field::<HashMap<String, VersionState>>(&body, "versions", READ_METADATA)?;
            let mut active = Vec::with_capacity(states.len());
            for (key, state) in states {
                let version = key.parse::<u64>().map_err(|_| VaultError::InvalidVersion {
                    path: resolved.logical.clone(),
                    key: key.clone(),
                })?;
                if state.is_active() {
                    active.push(version);
                }
            }
            active.sort_unstable();

            if active.is_empty() {
                debug!(path = %resolved.logical, "No active versions to delete");
                return Ok(active);
            }

            self.client()
                .write(&resolved.delete_path(), &json!({ "versions": active }))
                .await
                .map_err(VaultError::request(DELETE_VERSIONS))?;

            debug!(path = %resolved.logical, versions = ?active, "Deleted secret versions");
            Ok(active)
        }
        .instrument(span)
        .await
    }

    async fn read_metadata_body(&self, resolved: &ResolvedPath) -> Result<Map<String, Value>> {
        let response = self
            .client()
            .read(&resolved.metadata_path())
            .await
            .map_err(VaultError::request(READ_METADATA))?
            .ok_or_else(|| VaultError::NoMetadata { path: resolved.logical.clone() })?;
        Ok(response_data(&response, READ_METADATA)?.clone())
    }

    async fn read_custom_metadata(&self, resolved: &ResolvedPath) -> Result<HashMap<String, String>> {
        let body = self.read_metadata_body(resolved).await.map_err(|err| match err {
            VaultError::NoMetadata { path } => VaultError::MissingMetadata { path },
            other => other,
        })?;
        custom_metadata(&body, READ_METADATA)?
            .ok_or_else(|| VaultError::MissingMetadata { path: resolved.logical.clone() })
    }

    async fn write_custom_metadata(
        &self,
        resolved: &ResolvedPath,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        self.client()
            .write(&resolved.metadata_path(), &json!({ CUSTOM_METADATA_FIELD: metadata }))
            .await
            .map_err(VaultError::request(WRITE_METADATA))?;
        Ok(())
    }
}
