//! KV mount discovery and API path rewriting.
//!
//! A logical path such as `secret/team/db` is served by some mount (`secret/`). KV v2
//! exposes each secret under three API paths obtained by inserting a segment right after
//! the mount: `secret/data/team/db`, `secret/metadata/team/db` and `secret/delete/team/db`.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::error::{Result, VaultError};
use super::transport::LogicalClient;
use super::wire::{optional_field, response_data, MountOptions};

const DISCOVER_MOUNT: &str = "discover mount";

/// KV secrets engine generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    /// Parse the `options.version` value of a mount. Anything but `"2"` is version 1.
    pub fn from_option(raw: Option<&str>) -> Self {
        match raw {
            Some("2") => Self::V2,
            _ => Self::V1,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl fmt::Display for KvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Segment inserted after the mount path to address a KV v2 sub-API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiSegment {
    Data,
    Metadata,
    Delete,
}

impl ApiSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Metadata => "metadata",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ApiSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secrets engine mount as reported by Vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Mount path, usually with a trailing slash (`secret/`)
    pub path: String,
    pub version: KvVersion,
}

impl Mount {
    /// What older Vault servers without the discovery endpoint are assumed to run.
    pub fn legacy() -> Self {
        Self { path: String::new(), version: KvVersion::V1 }
    }
}

/// A normalized logical path together with the mount serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub logical: String,
    pub mount: Mount,
}

impl ResolvedPath {
    pub fn api_path(&self, segment: ApiSegment) -> String {
        add_prefix_to_kv_path(&self.logical, &self.mount.path, segment)
    }

    pub fn data_path(&self) -> String {
        self.api_path(ApiSegment::Data)
    }

    pub fn metadata_path(&self) -> String {
        self.api_path(ApiSegment::Metadata)
    }

    pub fn delete_path(&self) -> String {
        self.api_path(ApiSegment::Delete)
    }
}

/// Strip surrounding whitespace and any leading or trailing slashes.
pub fn normalize_path(path: &str) -> String {
    path.trim_matches(|c: char| c == '/' || c.is_whitespace()).to_string()
}

/// Insert `segment` right after `mount_path` in `path`.
///
/// When the mount path carries a namespace prefix that the literal path does not, leading
/// mount segments are dropped until the remainder is a prefix of the path or nothing is
/// left to drop.
pub fn add_prefix_to_kv_path(path: &str, mount_path: &str, segment: ApiSegment) -> String {
    if path == mount_path || path == mount_path.trim_end_matches('/') {
        return join_clean(&[mount_path, segment.as_str()]);
    }

    let mut mount = mount_path.to_string();
    let mut remainder = path.strip_prefix(mount.as_str()).unwrap_or(path).to_string();
    while remainder == path {
        let Some((_, rest)) = mount.split_once('/') else {
            break;
        };
        if rest.is_empty() {
            break;
        }
        mount = rest.strip_suffix('/').unwrap_or(rest).to_string();
        if let Some(stripped) = remainder.strip_prefix(mount.as_str()) {
            remainder = stripped.to_string();
        }
    }

    join_clean(&[&mount, segment.as_str(), &remainder])
}

/// Inverse of [`add_prefix_to_kv_path`] for paths that start with their mount.
pub fn strip_api_segment(api_path: &str, mount_path: &str, segment: ApiSegment) -> Option<String> {
    let mount = mount_path.trim_end_matches('/');
    let rest = api_path.strip_prefix(mount)?.strip_prefix('/')?.strip_prefix(segment.as_str())?;
    if rest.is_empty() {
        return Some(mount.to_string());
    }
    let rest = rest.strip_prefix('/')?;
    Some(join_clean(&[mount, rest]))
}

/// Join path elements with `/` and clean the result: empty and `.` elements are dropped,
/// `..` removes the previous element.
fn join_clean(parts: &[&str]) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    for element in parts.iter().flat_map(|p| p.split('/')) {
        match element {
            "" | "." => {}
            ".." => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned.join("/")
}

/// Resolves logical paths to KV v2 API paths by asking Vault which mount serves them.
pub struct PathResolver<C> {
    client: Arc<C>,
    cache: Option<DashMap<String, Mount>>,
}

impl<C: LogicalClient> PathResolver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, cache: None }
    }

    /// Remember discovered mounts per normalized path instead of probing on every call.
    pub fn with_mount_cache(mut self) -> Self {
        self.cache = Some(DashMap::new());
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Discover the mount serving `path`, whatever its KV version.
    pub async fn probe_mount(&self, path: &str) -> Result<Mount> {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return Err(VaultError::invalid_path(path, "path is empty"));
        }

        if let Some(mount) = self.cache.as_ref().and_then(|c| c.get(&normalized)) {
            return Ok(mount.clone());
        }

        let response = self
            .client
            .read_mount(&normalized)
            .await
            .map_err(|source| VaultError::MountProbe { path: normalized.clone(), source })?;

        let mount = match response {
            // Older Vault servers have no discovery endpoint
            None => Mount::legacy(),
            Some(response) => {
                let data = response_data(&response, DISCOVER_MOUNT)?;
                let path = optional_field::<String>(data, "path", DISCOVER_MOUNT)?
                    .unwrap_or_default();
                let options = optional_field::<MountOptions>(data, "options", DISCOVER_MOUNT)?
                    .unwrap_or_default();
                Mount { path, version: KvVersion::from_option(options.version.as_deref()) }
            }
        };

        debug!(path = %normalized, mount = %mount.path, kv_version = %mount.version, "Discovered mount");

        if let Some(cache) = &self.cache {
            cache.insert(normalized, mount.clone());
        }
        Ok(mount)
    }

    /// Resolve `path` to its KV v2 mount, rejecting any other engine version.
    pub async fn resolve(&self, path: &str) -> Result<ResolvedPath> {
        let mount = self.probe_mount(path).await?;
        let logical = normalize_path(path);
        if mount.version != KvVersion::V2 {
            debug!(path = %logical, mount = %mount.path, "Path not using a KV v2 mount, metadata not supported");
            return Err(VaultError::UnsupportedMount {
                path: logical,
                mount: mount.path,
                version: mount.version.as_u8(),
            });
        }
        Ok(ResolvedPath { logical, mount })
    }

    pub async fn api_path(&self, path: &str, segment: ApiSegment) -> Result<String> {
        Ok(self.resolve(path).await?.api_path(segment))
    }

    pub async fn data_path(&self, path: &str) -> Result<String> {
        self.api_path(path, ApiSegment::Data).await
    }

    pub async fn metadata_path(&self, path: &str) -> Result<String> {
        self.api_path(path, ApiSegment::Metadata).await
    }

    pub async fn delete_path(&self, path: &str) -> Result<String> {
        self.api_path(path, ApiSegment::Delete).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::error::TransportError;
    use crate::vault::transport::LogicalResponse;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Answers every mount probe with a fixed response and counts the probes.
    struct FixedMount {
        response: Option<Value>,
        probes: Mutex<Vec<String>>,
    }

    impl FixedMount {
        fn new(response: Option<Value>) -> Arc<Self> {
            Arc::new(Self { response, probes: Mutex::new(Vec::new()) })
        }

        fn probes(&self) -> Vec<String> {
            self.probes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogicalClient for FixedMount {
        async fn read(&self, _: &str) -> std::result::Result<Option<LogicalResponse>, TransportError> {
            Ok(None)
        }

        async fn write(
            &self,
            _: &str,
            _: &Value,
        ) -> std::result::Result<Option<LogicalResponse>, TransportError> {
            Ok(None)
        }

        async fn delete(&self, _: &str) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn read_mount(
            &self,
            path: &str,
        ) -> std::result::Result<Option<LogicalResponse>, TransportError> {
            self.probes.lock().unwrap().push(path.to_string());
            Ok(self.response.clone().map(LogicalResponse::with_data))
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/secret/foo/"), "secret/foo");
        assert_eq!(normalize_path("///secret/foo//"), "secret/foo");
        assert_eq!(normalize_path("  /secret/foo  "), "secret/foo");
        assert_eq!(normalize_path("secret"), "secret");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_add_prefix_simple_mount() {
        assert_eq!(
            add_prefix_to_kv_path("secret/foo/bar", "secret/", ApiSegment::Data),
            "secret/data/foo/bar"
        );
        assert_eq!(
            add_prefix_to_kv_path("secret/foo", "secret/", ApiSegment::Metadata),
            "secret/metadata/foo"
        );
        assert_eq!(
            add_prefix_to_kv_path("secret/foo", "secret/", ApiSegment::Delete),
            "secret/delete/foo"
        );
    }

    #[test]
    fn test_add_prefix_nested_mount() {
        assert_eq!(
            add_prefix_to_kv_path("team/kv/app/db", "team/kv/", ApiSegment::Data),
            "team/kv/data/app/db"
        );
    }

    #[test]
    fn test_add_prefix_path_equal_to_mount() {
        assert_eq!(add_prefix_to_kv_path("secret", "secret/", ApiSegment::Data), "secret/data");
        assert_eq!(
            add_prefix_to_kv_path("secret/", "secret/", ApiSegment::Metadata),
            "secret/metadata"
        );
    }

    #[test]
    fn test_add_prefix_strips_namespace_from_mount() {
        assert_eq!(
            add_prefix_to_kv_path("secret/foo", "ns1/secret/", ApiSegment::Data),
            "secret/data/foo"
        );
        assert_eq!(
            add_prefix_to_kv_path("secret/foo/bar", "ns1/ns2/secret/", ApiSegment::Metadata),
            "secret/metadata/foo/bar"
        );
    }

    #[test]
    fn test_add_prefix_gives_up_when_no_segment_matches() {
        // Nothing of the mount appears in the path: the last mount segment is used as is
        assert_eq!(
            add_prefix_to_kv_path("other/foo", "ns1/secret/", ApiSegment::Data),
            "secret/data/other/foo"
        );
    }

    #[test]
    fn test_strip_api_segment_inverts_rewrite() {
        let api = add_prefix_to_kv_path("secret/foo/bar", "secret/", ApiSegment::Data);
        assert_eq!(
            strip_api_segment(&api, "secret/", ApiSegment::Data),
            Some("secret/foo/bar".to_string())
        );
        assert_eq!(
            strip_api_segment("secret/data", "secret/", ApiSegment::Data),
            Some("secret".to_string())
        );
        assert_eq!(strip_api_segment("secret/metadata/foo", "secret/", ApiSegment::Data), None);
        assert_eq!(strip_api_segment("secret/datafoo", "secret/", ApiSegment::Data), None);
    }

    #[test]
    fn test_kv_version_from_option() {
        assert_eq!(KvVersion::from_option(Some("2")), KvVersion::V2);
        assert_eq!(KvVersion::from_option(Some("1")), KvVersion::V1);
        assert_eq!(KvVersion::from_option(Some("")), KvVersion::V1);
        assert_eq!(KvVersion::from_option(Some("3")), KvVersion::V1);
        assert_eq!(KvVersion::from_option(None), KvVersion::V1);
    }

    #[tokio::test]
    async fn test_resolve_kv2_mount() {
        let client =
            FixedMount::new(Some(json!({"path": "secret/", "type": "kv", "options": {"version": "2"}})));
        let resolver = PathResolver::new(client.clone());

        let resolved = resolver.resolve("/secret/foo/").await.unwrap();
        assert_eq!(resolved.logical, "secret/foo");
        assert_eq!(resolved.data_path(), "secret/data/foo");
        assert_eq!(resolved.metadata_path(), "secret/metadata/foo");
        assert_eq!(resolved.delete_path(), "secret/delete/foo");
        assert_eq!(client.probes(), vec!["secret/foo".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_endpoint_defaults_to_v1() {
        let resolver = PathResolver::new(FixedMount::new(None));

        assert_eq!(resolver.probe_mount("secret/foo").await.unwrap(), Mount::legacy());
        let err = resolver.resolve("secret/foo").await.unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedMount { version: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_or_null_options_default_to_v1() {
        for response in [
            json!({"path": "kv/"}),
            json!({"path": "kv/", "options": null}),
            json!({"path": "kv/", "options": {"version": ""}}),
            json!({"path": "kv/", "options": {}}),
        ] {
            let resolver = PathResolver::new(FixedMount::new(Some(response)));
            let mount = resolver.probe_mount("kv/foo").await.unwrap();
            assert_eq!(mount, Mount { path: "kv/".to_string(), version: KvVersion::V1 });
        }
    }

    #[tokio::test]
    async fn test_malformed_options_is_an_error() {
        let resolver =
            PathResolver::new(FixedMount::new(Some(json!({"path": "kv/", "options": {"version": 2}}))));
        let err = resolver.probe_mount("kv/foo").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidField { field: "options", .. }));
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let client = FixedMount::new(None);
        let resolver = PathResolver::new(client.clone());
        assert!(matches!(resolver.resolve("//").await, Err(VaultError::InvalidPath { .. })));
        assert!(client.probes().is_empty());
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent_without_cache() {
        let client =
            FixedMount::new(Some(json!({"path": "secret/", "options": {"version": "2"}})));
        let resolver = PathResolver::new(client.clone());

        let first = resolver.resolve("secret/foo").await.unwrap();
        let second = resolver.resolve("/secret/foo").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.probes().len(), 2);
    }

    #[tokio::test]
    async fn test_mount_cache_skips_repeated_probes() {
        let client =
            FixedMount::new(Some(json!({"path": "secret/", "options": {"version": "2"}})));
        let resolver = PathResolver::new(client.clone()).with_mount_cache();

        resolver.resolve("secret/foo").await.unwrap();
        resolver.resolve("/secret/foo/").await.unwrap();
        resolver.resolve("secret/bar").await.unwrap();
        assert_eq!(client.probes(), vec!["secret/foo".to_string(), "secret/bar".to_string()]);
    }
}
