//! Typed shapes of the KV v2 and mount discovery responses.
//!
//! Every response is decoded field by field so that an absent field and a field of the
//! wrong type surface as different errors.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{Result, VaultError};
use super::transport::LogicalResponse;

/// Field holding the secret's data in KV v2 data requests and responses.
pub const SECRET_DATA_FIELD: &str = "data";

/// Field holding user-supplied tags in KV v2 metadata requests and responses.
pub const CUSTOM_METADATA_FIELD: &str = "custom_metadata";

/// `options` block of a mount discovery response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MountOptions {
    #[serde(default)]
    pub version: Option<String>,
}

/// Version metadata returned with a KV v2 data read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub created_time: String,

    /// Empty while the version is live
    #[serde(default)]
    pub deletion_time: String,

    #[serde(default)]
    pub destroyed: bool,

    #[serde(default)]
    pub version: u64,
}

impl VersionMetadata {
    pub fn is_deleted(&self) -> bool {
        !self.deletion_time.is_empty() || self.destroyed
    }
}

/// State of a single version in a KV v2 metadata response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionState {
    #[serde(default)]
    pub created_time: String,

    #[serde(default)]
    pub deletion_time: String,

    #[serde(default)]
    pub destroyed: bool,
}

impl VersionState {
    pub fn is_active(&self) -> bool {
        self.deletion_time.is_empty() && !self.destroyed
    }
}

/// The `data` object of a response, which every endpoint used here must return.
pub(crate) fn response_data<'a>(
    response: &'a LogicalResponse,
    operation: &'static str,
) -> Result<&'a Map<String, Value>> {
    match &response.data {
        None | Some(Value::Null) => Err(VaultError::MissingField { operation, field: "data" }),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(VaultError::InvalidField {
            operation,
            field: "data",
            source: <serde_json::Error as serde::de::Error>::custom(format!(
                "expected an object, found {}",
                json_kind(other)
            )),
        }),
    }
}

/// Decode an optional field. Absent and null both yield `None`.
pub(crate) fn optional_field<T: DeserializeOwned>(
    data: &Map<String, Value>,
    field: &'static str,
    operation: &'static str,
) -> Result<Option<T>> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| VaultError::InvalidField { operation, field, source }),
    }
}

/// Decode a field that must be present.
pub(crate) fn required_field<T: DeserializeOwned>(
    data: &Map<String, Value>,
    field: &'static str,
    operation: &'static str,
) -> Result<T> {
    optional_field(data, field, operation)?.ok_or(VaultError::MissingField { operation, field })
}

/// Custom metadata of a metadata response, `None` when the field is absent or null.
pub(crate) fn custom_metadata(
    data: &Map<String, Value>,
    operation: &'static str,
) -> Result<Option<HashMap<String, String>>> {
    optional_field(data, CUSTOM_METADATA_FIELD, operation)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
