//! # Configuration Management
//!
//! Provider configuration is layered, lowest precedence first:
//! 1. an optional TOML file
//! 2. `VAULTPROV_*` environment variables, `__` separating nested keys
//!    (`VAULTPROV_REQUEST__TIMEOUT_SECONDS=60`)
//! 3. the standard `VAULT_ADDR`, `VAULT_TOKEN` and `VAULT_NAMESPACE` variables, only for
//!    values still unset after the first two layers

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Error, Result};
use crate::secrets::SecretString;
use crate::vault::RequestOptions;

/// Prefix of the crate's own environment variables
pub const ENV_PREFIX: &str = "VAULTPROV";

pub const DEFAULT_LOGIN_PATH: &str = "auth/kubernetes/login";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Connection and authentication settings for the Vault server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Vault server URL
    #[serde(default)]
    #[validate(url(message = "Vault address must be a valid URL"))]
    pub address: String,

    /// Static token. Meant for debugging only; takes precedence over `auth`.
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Vault Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// Kubernetes service account login
    #[serde(default)]
    #[validate(nested)]
    pub auth: Option<KubernetesAuthConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub request: RequestSettings,

    /// Remember discovered mounts instead of probing on every operation
    #[serde(default)]
    pub cache_mounts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KubernetesAuthConfig {
    /// Login endpoint, `auth/<mount>/login`
    #[serde(default = "default_login_path")]
    #[validate(length(min = 1, message = "Login path cannot be empty"))]
    pub path: String,

    #[validate(length(min = 1, message = "Role cannot be empty"))]
    pub role: String,

    /// Service account token
    pub jwt: SecretString,
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

/// Behaviour applied to every request sent to Vault.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RequestSettings {
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Log the curl equivalent of each request
    #[serde(default)]
    pub echo_requests: bool,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self { timeout_seconds: DEFAULT_TIMEOUT_SECONDS, echo_requests: false }
    }
}

impl RequestSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions { echo_requests: self.echo_requests }
    }
}

impl ProviderConfig {
    /// Load configuration from `file` (if any) and the environment. The result is not
    /// validated yet, so command line overrides can still be applied.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                config::File::from(file).format(config::FileFormat::Toml).required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: ProviderConfig = builder.build()?.try_deserialize()?;
        loaded.apply_vault_env_fallbacks();
        Ok(loaded)
    }

    /// Fill unset values from `VAULT_ADDR`, `VAULT_TOKEN` and `VAULT_NAMESPACE`.
    pub fn apply_vault_env_fallbacks(&mut self) {
        if self.address.trim().is_empty() {
            if let Ok(address) = std::env::var("VAULT_ADDR") {
                self.address = address;
            }
        }
        if self.token.is_none() {
            self.token = std::env::var("VAULT_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(SecretString::new);
        }
        if self.namespace.is_none() {
            self.namespace = std::env::var("VAULT_NAMESPACE").ok().filter(|ns| !ns.is_empty());
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::validation(
                "Vault address is required (set `address`, VAULTPROV_ADDRESS or VAULT_ADDR)",
            ));
        }

        Validate::validate(self).map_err(Error::from)?;

        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if let Some(auth) = &self.auth {
            if auth.jwt.is_empty() {
                return Err(Error::validation("Kubernetes auth JWT cannot be empty"));
            }
            crate::vault::login_mount(&auth.path)?;
        }

        Ok(())
    }

    /// Token mode wins over Kubernetes login when both are configured.
    pub fn uses_token(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_empty())
    }
}
