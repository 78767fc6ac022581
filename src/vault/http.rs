//! HTTP implementation of [`LogicalClient`] on top of `reqwest`.

use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::error::TransportError;
use super::transport::{LogicalClient, LogicalResponse};
use crate::secrets::SecretString;

const MOUNT_DISCOVERY_PREFIX: &str = "sys/internal/ui/mounts";

/// Per-request behaviour that applies to semantic operations but never to the mount probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Log the curl equivalent of every request
    pub echo_requests: bool,
}

impl RequestOptions {
    /// Options with every feature turned off.
    pub fn disabled() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault client speaking the logical HTTP API (`/v1/<path>`).
pub struct HttpLogicalClient {
    http: reqwest::Client,
    address: Url,
    token: RwLock<Option<SecretString>>,
    namespace: Option<String>,
    options: Mutex<RequestOptions>,
}

impl std::fmt::Debug for HttpLogicalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLogicalClient")
            .field("address", &self.address.as_str())
            .field("namespace", &self.namespace)
            .field("has_token", &self.read_token().is_some())
            .finish()
    }
}

impl HttpLogicalClient {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut address = Url::parse(address).map_err(|e| {
            TransportError::InvalidRequest(format!("invalid Vault address '{}': {}", address, e))
        })?;
        if !address.path().ends_with('/') {
            let path = format!("{}/", address.path());
            address.set_path(&path);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            address,
            token: RwLock::new(None),
            namespace: None,
            options: Mutex::new(RequestOptions::default()),
        })
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    pub fn with_token(self, token: Option<SecretString>) -> Self {
        self.set_token(token);
        self
    }

    pub fn with_options(self, options: RequestOptions) -> Self {
        self.set_options(options);
        self
    }

    /// Replace the token sent with every following request.
    pub fn set_token(&self, token: Option<SecretString>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = token.filter(|t| !t.is_empty());
    }

    pub fn set_options(&self, options: RequestOptions) {
        let mut slot = self.options.lock().unwrap_or_else(|e| e.into_inner());
        *slot = options;
    }

    pub fn options(&self) -> RequestOptions {
        self.options.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    fn read_token(&self) -> Option<SecretString> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        let path = path.trim_start_matches('/');
        self.address
            .join(&format!("v1/{}", path))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid path '{}': {}", path, e)))
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<RequestBuilder, TransportError> {
        let url = self.url(path)?;
        if options.echo_requests {
            info!(curl = %self.curl_string(&method, &url, body.is_some()), "Vault request");
        }

        let mut builder = self.http.request(method, url).header("X-Vault-Request", "true");
        if let Some(token) = self.read_token() {
            builder = builder.header("X-Vault-Token", token.expose_secret());
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Shell command reproducing a request. The token is never included.
    fn curl_string(&self, method: &Method, url: &Url, has_body: bool) -> String {
        let mut parts = vec![format!("curl -X {}", method)];
        if self.read_token().is_some() {
            parts.push("-H \"X-Vault-Token: $(vault print token)\"".to_string());
        }
        if let Some(namespace) = &self.namespace {
            parts.push(format!("-H \"X-Vault-Namespace: {}\"", namespace));
        }
        parts.push("-H \"X-Vault-Request: true\"".to_string());
        if has_body {
            parts.push("-d @payload.json".to_string());
        }
        parts.push(url.to_string());
        parts.join(" ")
    }

    async fn envelope(response: Response) -> Result<Option<LogicalResponse>, TransportError> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: LogicalResponse = serde_json::from_str(&body)?;
        if envelope.is_wrapped() {
            return Err(TransportError::Wrapped);
        }
        Ok(Some(envelope))
    }

    async fn status_error(response: Response) -> TransportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let mut errors = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default().errors;
        if errors.is_empty() {
            let fallback = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.trim().to_string()
            };
            errors.push(fallback);
        }
        TransportError::Status { status: status.as_u16(), errors }
    }

    async fn get(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Option<LogicalResponse>, TransportError> {
        let response = self.build(Method::GET, path, None, options)?.send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            // KV v2 answers 404 with a body when the latest version is deleted
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                let envelope = serde_json::from_str::<LogicalResponse>(&body).ok();
                Ok(envelope.filter(LogicalResponse::has_content))
            }
            status if status.is_success() => Self::envelope(response).await,
            _ => Err(Self::status_error(response).await),
        }
    }
}

#[async_trait]
impl LogicalClient for HttpLogicalClient {
    async fn read(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError> {
        debug!(path = %path, "Reading from Vault");
        self.get(path, &self.options()).await
    }

    async fn write(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<Option<LogicalResponse>, TransportError> {
        debug!(path = %path, "Writing to Vault");
        let response = self.build(Method::PUT, path, Some(body), &self.options())?.send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Self::envelope(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        debug!(path = %path, "Deleting from Vault");
        let response = self.build(Method::DELETE, path, None, &self.options())?.send().await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::status_error(response).await)
    }

    async fn read_mount(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError> {
        let probe_path = format!("{}/{}", MOUNT_DISCOVERY_PREFIX, path.trim_start_matches('/'));
        self.get(&probe_path, &RequestOptions::disabled()).await
    }
}
