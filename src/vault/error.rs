//! Error types for Vault path resolution and secret lifecycle operations.

use thiserror::Error;

/// Failures raised by a [`LogicalClient`](super::LogicalClient) implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Vault answered with a non-success status.
    #[error("Vault responded with status {status}: {}", .errors.join("; "))]
    Status { status: u16, errors: Vec<String> },

    /// The response body was not valid JSON for the expected envelope.
    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),

    /// Vault returned a response-wrapping token instead of the result.
    #[error("Vault response-wrapped the result, unwrapping is not supported")]
    Wrapped,

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Create a status error with a single message.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, errors: vec![message.into()] }
    }

    /// HTTP status code, when Vault answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors from the path resolution and secret store layers.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The logical path is empty once normalized.
    #[error("invalid secret path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The path is not served by a KV version 2 engine.
    #[error(
        "unsupported mount for path '{path}': KV version {version} at mount '{mount}', only KV version 2 is supported"
    )]
    UnsupportedMount { path: String, mount: String, version: u8 },

    /// Something already lives at the secret's data path.
    #[error("secret {path} already exists")]
    AlreadyExists { path: String },

    /// The secret exists but carries no custom metadata.
    #[error("missing custom metadata for secret {path}")]
    MissingMetadata { path: String },

    /// There is no metadata at all for the secret.
    #[error("no metadata for secret {path}")]
    NoMetadata { path: String },

    /// The latest version of the secret was deleted out of band.
    #[error("secret {path} is marked deleted (version {version})")]
    SecretDeleted { path: String, version: u64 },

    /// A sub-operation against Vault failed.
    #[error("unable to {operation}: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// Mount discovery failed.
    #[error("unable to discover mount for '{path}': {source}")]
    MountProbe {
        path: String,
        #[source]
        source: TransportError,
    },

    /// A required response field is absent or null.
    #[error("unable to {operation}: missing field '{field}' in response")]
    MissingField { operation: &'static str, field: &'static str },

    /// A response field is present but does not have the expected shape.
    #[error("unable to {operation}: field '{field}' has an unexpected shape: {source}")]
    InvalidField {
        operation: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A version key in the secret's metadata is not a number.
    #[error("invalid version number '{key}' in metadata for secret {path}")]
    InvalidVersion { path: String, key: String },
}

impl VaultError {
    /// Wrap a transport failure with the name of the failing sub-operation.
    pub fn request(operation: &'static str) -> impl FnOnce(TransportError) -> Self {
        move |source| Self::Request { operation, source }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into(), reason: reason.into() }
    }
}
