//! Keypair resource: two linked secrets at `<base_path>/private` and `<base_path>/public`.
//!
//! The halves are written one after the other. A failure after the first write is undone
//! where possible and otherwise reported as a partial failure that needs manual cleanup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::{
    check_user_metadata, secret_data, user_metadata, KeypairPart, SecretType,
    KEYPAIR_LINKED_SECRET_METADATA, KEYPAIR_PART_METADATA, SECRET_LENGTH_METADATA,
    SECRET_TYPE_METADATA,
};
use crate::errors::{Error, Result, Warning};
use crate::secrets::{generate_curve25519_keypair, CURVE25519_KEY_LENGTH};
use crate::vault::{LogicalClient, SecretStore};

/// Paths of the private and public halves for `base_path`.
pub fn keypair_paths(base_path: &str) -> (String, String) {
    let base = base_path.trim_end_matches('/');
    (format!("{}/{}", base, KeypairPart::Private), format!("{}/{}", base, KeypairPart::Public))
}

/// Desired or recorded state of a keypair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct KeypairSecretModel {
    #[validate(length(min = 1, message = "Base path cannot be empty"))]
    pub base_path: String,

    /// Key algorithm, only `curve25519` is supported
    #[serde(rename = "type", default = "default_key_type")]
    pub key_type: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Must be set for delete to go through
    #[serde(default)]
    pub force_destroy: bool,
}

fn default_key_type() -> String {
    SecretType::Curve25519.to_string()
}

impl KeypairSecretModel {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            key_type: default_key_type(),
            metadata: HashMap::new(),
            force_destroy: false,
        }
    }

    /// Full custom metadata for one half. Each call returns a fresh map.
    fn half_metadata(
        &self,
        part: KeypairPart,
        linked_path: &str,
        user: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut metadata = user.clone();
        metadata.insert(SECRET_TYPE_METADATA.to_string(), self.key_type.clone());
        metadata.insert(SECRET_LENGTH_METADATA.to_string(), CURVE25519_KEY_LENGTH.to_string());
        metadata.insert(KEYPAIR_LINKED_SECRET_METADATA.to_string(), linked_path.to_string());
        metadata.insert(KEYPAIR_PART_METADATA.to_string(), part.to_string());
        metadata
    }
}

fn check_key_type(key_type: &str) -> Result<()> {
    if key_type == SecretType::Curve25519.as_str() {
        return Ok(());
    }
    Err(Error::validation(format!(
        "Unsupported secret type: {}. Supported types are: {}",
        key_type,
        SecretType::Curve25519
    )))
}

/// Keeps the two halves of a keypair consistent across their lifecycle.
pub struct KeypairSecretOrchestrator<C> {
    store: SecretStore<C>,
}

impl<C> Clone for KeypairSecretOrchestrator<C> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<C: LogicalClient> KeypairSecretOrchestrator<C> {
    pub fn new(store: SecretStore<C>) -> Self {
        Self { store }
    }

    /// Generate a keypair and store the private half, then the public half.
    ///
    /// If the public write fails the private half is deleted again. When that delete also
    /// fails the error carries a warning naming the orphaned private key.
    #[instrument(skip(self, plan), fields(base_path = %plan.base_path, key_type = %plan.key_type))]
    pub async fn create(&self, plan: &KeypairSecretModel) -> Result<KeypairSecretModel> {
        plan.validate()?;
        check_key_type(&plan.key_type)?;
        check_user_metadata(&plan.metadata)?;

        let keypair = generate_curve25519_keypair();
        let (private_path, public_path) = keypair_paths(&plan.base_path);

        let private_metadata =
            plan.half_metadata(KeypairPart::Private, &public_path, &plan.metadata);
        self.store
            .create(&private_path, secret_data(&keypair.private), private_metadata)
            .await
            .inspect_err(|e| error!(path = %private_path, error = %e, "Failed to create private key"))?;

        let public_metadata =
            plan.half_metadata(KeypairPart::Public, &private_path, &plan.metadata);
        let public_result = self
            .store
            .create(&public_path, secret_data(&keypair.public_bytes()), public_metadata)
            .await;

        if let Err(primary) = public_result {
            error!(path = %public_path, error = %primary, "Failed to create public key, rolling back private key");
            return Err(match self.store.delete(&private_path).await {
                Ok(_) => primary.into(),
                Err(rollback) => {
                    warn!(path = %private_path, error = %rollback, "Rollback of private key failed");
                    Error::partial_failure(
                        primary.into(),
                        Warning::new(
                            "Rollback failed after public key creation error",
                            format!(
                                "Failed to delete previously created private key at {}: {}",
                                private_path, rollback
                            ),
                        ),
                    )
                }
            });
        }

        info!(base_path = %plan.base_path, "Created keypair");
        Ok(plan.clone())
    }

    /// Refresh `state` from the private half. `None` means the keypair is gone.
    #[instrument(skip(self, state), fields(base_path = %state.base_path))]
    pub async fn read(&self, state: &KeypairSecretModel) -> Result<Option<KeypairSecretModel>> {
        let (private_path, _) = keypair_paths(&state.base_path);
        let Some(secret) = self.store.read(&private_path).await? else {
            info!(base_path = %state.base_path, "Keypair no longer exists");
            return Ok(None);
        };

        let key_type = secret
            .metadata
            .get(SECRET_TYPE_METADATA)
            .cloned()
            .unwrap_or_else(|| state.key_type.clone());

        Ok(Some(KeypairSecretModel {
            base_path: state.base_path.clone(),
            key_type,
            metadata: user_metadata(&secret.metadata),
            force_destroy: state.force_destroy,
        }))
    }

    /// Replace the user metadata on both halves. Base path and type can't change.
    #[instrument(skip(self, state, plan), fields(base_path = %state.base_path))]
    pub async fn update(
        &self,
        state: &KeypairSecretModel,
        plan: &KeypairSecretModel,
    ) -> Result<KeypairSecretModel> {
        if state.base_path != plan.base_path {
            return Err(Error::validation(format!(
                "Invalid base path change. Keypairs can't have their base path changed (old: {}, new: {}). Only metadata changes are authorized. Delete and recreate the keypair instead.",
                state.base_path, plan.base_path
            )));
        }
        if state.key_type != plan.key_type {
            return Err(Error::validation(format!(
                "Invalid type change. Keypairs can't have their type changed (old: {}, new: {}). Only metadata changes are authorized. Delete and recreate the keypair instead.",
                state.key_type, plan.key_type
            )));
        }
        check_user_metadata(&plan.metadata)?;

        let (private_path, public_path) = keypair_paths(&state.base_path);
        let private_metadata =
            state.half_metadata(KeypairPart::Private, &public_path, &plan.metadata);
        let public_metadata =
            state.half_metadata(KeypairPart::Public, &private_path, &plan.metadata);

        self.store.update_metadata(&private_path, private_metadata).await?;
        if let Err(primary) = self.store.update_metadata(&public_path, public_metadata).await {
            error!(path = %public_path, error = %primary, "Failed to update public key metadata");
            return Err(Error::partial_failure(
                primary.into(),
                Warning::new(
                    "Partial update: private key metadata already updated",
                    format!(
                        "Metadata of {} was updated but {} still carries the previous metadata",
                        private_path, public_path
                    ),
                ),
            ));
        }

        info!(base_path = %state.base_path, "Updated keypair metadata");
        Ok(KeypairSecretModel {
            metadata: plan.metadata.clone(),
            force_destroy: plan.force_destroy,
            ..state.clone()
        })
    }

    /// Soft-delete both halves. Requires `force_destroy`.
    #[instrument(skip(self, state), fields(base_path = %state.base_path))]
    pub async fn delete(&self, state: &KeypairSecretModel) -> Result<()> {
        if !state.force_destroy {
            return Err(Error::validation(format!(
                "Can't delete keypair at '{}': 'force_destroy' must be set to 'true'",
                state.base_path
            )));
        }

        let (private_path, public_path) = keypair_paths(&state.base_path);
        self.store.delete(&private_path).await?;

        if let Err(primary) = self.store.delete(&public_path).await {
            error!(path = %public_path, error = %primary, "Failed to delete public key");
            return Err(Error::partial_failure(
                primary.into(),
                Warning::new(
                    "Partial deletion: private key already deleted",
                    format!(
                        "Private key at {} was deleted but public key at {} still exists and requires manual cleanup",
                        private_path, public_path
                    ),
                ),
            ));
        }

        info!(base_path = %state.base_path, "Deleted keypair");
        Ok(())
    }

    /// Adopt an existing keypair by base path.
    pub async fn import(&self, base_path: &str) -> Result<Option<KeypairSecretModel>> {
        self.read(&KeypairSecretModel::new(base_path)).await
    }
}
