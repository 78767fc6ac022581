//! Kubernetes service account login.

use std::time::Duration;

use tracing::{error, info};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};

use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Credentials for the Kubernetes auth method.
#[derive(Debug, Clone)]
pub struct KubernetesLogin<'a> {
    /// Login path, e.g. `auth/kubernetes/login`
    pub path: &'a str,
    pub role: &'a str,
    pub jwt: &'a SecretString,
}

/// Extract the auth mount from a login path: `auth/<mount>/login` gives `<mount>`.
pub fn login_mount(path: &str) -> Result<String> {
    let trimmed = path.trim().trim_matches('/');
    trimmed
        .strip_prefix("auth/")
        .and_then(|rest| rest.strip_suffix("/login"))
        .filter(|mount| !mount.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::config(format!(
                "invalid Kubernetes login path '{}': expected auth/<mount>/login",
                path
            ))
        })
}

/// Exchange a service account token for a Vault client token.
pub async fn kubernetes_login(
    address: &str,
    namespace: Option<&str>,
    timeout: Duration,
    login: &KubernetesLogin<'_>,
) -> Result<SecretString> {
    let mount = login_mount(login.path)?;

    let mut settings_builder = VaultClientSettingsBuilder::default();
    settings_builder.address(address);
    settings_builder.timeout(Some(timeout));
    if let Some(namespace) = namespace {
        settings_builder.namespace(Some(namespace.to_string()));
    }

    let settings = settings_builder
        .build()
        .map_err(|e| Error::config(format!("Invalid Vault configuration: {}", e)))?;
    let client = VaultClient::new(settings)
        .map_err(|e| Error::config(format!("Failed to create Vault client: {}", e)))?;

    let auth = vaultrs::auth::kubernetes::login(&client, &mount, login.role, login.jwt.expose_secret())
        .await
        .map_err(|e| {
            error!(mount = %mount, role = %login.role, error = %e, "Kubernetes login failed");
            Error::auth(format!("login at {} with role {} failed: {}", login.path, login.role, e))
        })?;

    if auth.client_token.is_empty() {
        return Err(Error::auth(format!("login at {} returned no client token", login.path)));
    }

    info!(mount = %mount, role = %login.role, "Authenticated with Kubernetes service account");
    Ok(SecretString::new(auth.client_token))
}
