//! Provider setup: authenticate against Vault and hand out the secret resources.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::errors::{Error, Result};
use crate::resources::{KeypairSecretOrchestrator, RandomSecretResource};
use crate::vault::{
    kubernetes_login, HttpLogicalClient, KubernetesLogin, LogicalClient, PathResolver,
    SecretStore,
};

/// A configured connection to Vault and the resources built on it.
pub struct Provider<C> {
    client: Arc<C>,
    store: SecretStore<C>,
}

impl<C> Clone for Provider<C> {
    fn clone(&self) -> Self {
        Self { client: Arc::clone(&self.client), store: self.store.clone() }
    }
}

impl Provider<HttpLogicalClient> {
    /// Validate `config`, authenticate and build the HTTP client.
    ///
    /// A static token wins over Kubernetes login. Without either, requests go out
    /// unauthenticated.
    pub async fn configure(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let timeout = config.request.timeout();
        let client = HttpLogicalClient::new(&config.address, timeout)
            .map_err(|e| Error::config(e.to_string()))?
            .with_namespace(config.namespace.clone())
            .with_options(config.request.request_options());

        if config.uses_token() {
            warn!("Authenticating with a static token, this is meant for debugging only");
            client.set_token(config.token.clone());
        } else if let Some(auth) = &config.auth {
            let login = KubernetesLogin { path: &auth.path, role: &auth.role, jwt: &auth.jwt };
            let token =
                kubernetes_login(&config.address, config.namespace.as_deref(), timeout, &login)
                    .await?;
            client.set_token(Some(token));
        } else {
            warn!("No token or Kubernetes auth configured, requests to Vault are unauthenticated");
        }

        info!(
            address = %config.address,
            namespace = config.namespace.as_deref().unwrap_or(""),
            cache_mounts = config.cache_mounts,
            "Vault provider configured"
        );

        Ok(Self::with_client(Arc::new(client), config.cache_mounts))
    }
}

impl<C: LogicalClient> Provider<C> {
    /// Build on an already authenticated client.
    pub fn with_client(client: Arc<C>, cache_mounts: bool) -> Self {
        let mut resolver = PathResolver::new(Arc::clone(&client));
        if cache_mounts {
            resolver = resolver.with_mount_cache();
        }
        Self { client, store: SecretStore::with_resolver(resolver) }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn store(&self) -> &SecretStore<C> {
        &self.store
    }

    pub fn random_secrets(&self) -> RandomSecretResource<C> {
        RandomSecretResource::new(self.store.clone())
    }

    pub fn keypair_secrets(&self) -> KeypairSecretOrchestrator<C> {
        KeypairSecretOrchestrator::new(self.store.clone())
    }
}
