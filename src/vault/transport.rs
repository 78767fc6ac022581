//! Generic logical request interface to Vault.
//!
//! Everything above this layer speaks in terms of four verbs: read, write, delete and
//! the mount discovery read. [`HttpLogicalClient`](super::HttpLogicalClient) is the
//! production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransportError;

/// Response envelope shared by all logical endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalResponse {
    #[serde(default)]
    pub request_id: String,

    /// Endpoint-specific payload
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(default)]
    pub warnings: Option<Vec<String>>,

    /// Present on login responses
    #[serde(default)]
    pub auth: Option<Value>,

    /// Set when Vault response-wrapped the result instead of returning it
    #[serde(default)]
    pub wrap_info: Option<Value>,
}

impl LogicalResponse {
    /// Response carrying only a data payload.
    pub fn with_data(data: Value) -> Self {
        Self { data: Some(data), ..Default::default() }
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrap_info.as_ref().is_some_and(|info| !info.is_null())
    }

    /// Whether a 404 answer still carries something worth returning.
    pub fn has_content(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_null())
            || self.warnings.as_ref().is_some_and(|warnings| !warnings.is_empty())
    }
}

/// Vault's generic key-value RPC interface.
///
/// `None` means Vault had nothing to return: a 404 on read, or an empty body on write.
#[async_trait]
pub trait LogicalClient: Send + Sync {
    /// Read the object at `path`.
    async fn read(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError>;

    /// Write `body` to `path`.
    async fn write(&self, path: &str, body: &Value)
        -> Result<Option<LogicalResponse>, TransportError>;

    /// Delete the object at `path`.
    async fn delete(&self, path: &str) -> Result<(), TransportError>;

    /// Look up the mount serving `path` via `sys/internal/ui/mounts/`.
    ///
    /// Implementations must not echo this call.
    /// `None` means the endpoint does not exist on this Vault.
    async fn read_mount(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError>;
}
