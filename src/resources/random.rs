//! Random secret resource: `length` random bytes stored at a single path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::{
    check_user_metadata, secret_data, user_metadata, SecretType, SECRET_LENGTH_METADATA,
    SECRET_TYPE_METADATA,
};
use crate::errors::{Error, Result};
use crate::secrets::{generate_random_secret, DEFAULT_RANDOM_SECRET_LENGTH};
use crate::vault::{LogicalClient, SecretStore};

/// Desired or recorded state of a random secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RandomSecretModel {
    /// Logical path of the secret, mount included
    #[validate(length(min = 1, message = "Path cannot be empty"))]
    pub path: String,

    /// Secret length in bytes
    #[serde(default = "default_length")]
    #[validate(range(min = 1, message = "Length must be at least 1"))]
    pub length: usize,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_length() -> usize {
    DEFAULT_RANDOM_SECRET_LENGTH
}

impl RandomSecretModel {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), length: DEFAULT_RANDOM_SECRET_LENGTH, metadata: HashMap::new() }
    }

    fn stored_metadata(&self) -> HashMap<String, String> {
        let mut metadata = self.metadata.clone();
        metadata.insert(SECRET_TYPE_METADATA.to_string(), SecretType::RandomSecret.to_string());
        metadata.insert(SECRET_LENGTH_METADATA.to_string(), self.length.to_string());
        metadata
    }
}

pub struct RandomSecretResource<C> {
    store: SecretStore<C>,
}

impl<C> Clone for RandomSecretResource<C> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<C: LogicalClient> RandomSecretResource<C> {
    pub fn new(store: SecretStore<C>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, plan), fields(path = %plan.path, length = plan.length))]
    pub async fn create(&self, plan: &RandomSecretModel) -> Result<RandomSecretModel> {
        plan.validate()?;
        check_user_metadata(&plan.metadata)?;

        let secret = generate_random_secret(plan.length)?;
        self.store.create(&plan.path, secret_data(&secret), plan.stored_metadata()).await?;

        info!(path = %plan.path, length = plan.length, "Created random secret");
        Ok(plan.clone())
    }

    /// Refresh `state` from Vault. `None` means the secret is gone.
    #[instrument(skip(self, state), fields(path = %state.path))]
    pub async fn read(&self, state: &RandomSecretModel) -> Result<Option<RandomSecretModel>> {
        let Some(secret) = self.store.read(&state.path).await? else {
            info!(path = %state.path, "Random secret no longer exists");
            return Ok(None);
        };

        let length = secret
            .metadata
            .get(SECRET_LENGTH_METADATA)
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(state.length);

        Ok(Some(RandomSecretModel {
            path: state.path.clone(),
            length,
            metadata: user_metadata(&secret.metadata),
        }))
    }

    /// Only metadata can change. The secret value is never regenerated.
    #[instrument(skip(self, state, plan), fields(path = %state.path))]
    pub async fn update(
        &self,
        state: &RandomSecretModel,
        plan: &RandomSecretModel,
    ) -> Result<RandomSecretModel> {
        if state.path != plan.path {
            return Err(Error::validation(format!(
                "Invalid path change. Random secrets can't have their path changed (old: {}, new: {}). Only metadata changes are authorized. Delete and recreate the secret instead.",
                state.path, plan.path
            )));
        }
        if state.length != plan.length {
            return Err(Error::validation(format!(
                "Invalid length change. Random secrets can't have their length changed (old: {}, new: {}). Only metadata changes are authorized. Delete and recreate the secret instead.",
                state.length, plan.length
            )));
        }
        check_user_metadata(&plan.metadata)?;

        self.store.update_metadata(&state.path, plan.stored_metadata()).await?;

        info!(path = %state.path, "Updated random secret metadata");
        Ok(RandomSecretModel { metadata: plan.metadata.clone(), ..state.clone() })
    }

    /// Soft-delete all active versions of the secret.
    #[instrument(skip(self, state), fields(path = %state.path))]
    pub async fn delete(&self, state: &RandomSecretModel) -> Result<()> {
        let versions = self.store.delete(&state.path).await?;
        info!(path = %state.path, versions = ?versions, "Deleted random secret");
        Ok(())
    }

    /// Adopt an existing secret by path.
    pub async fn import(&self, path: &str) -> Result<Option<RandomSecretModel>> {
        self.read(&RandomSecretModel::new(path)).await
    }
}
