//! In-memory KV v2 emulator for integration tests.
//!
//! Implements [`LogicalClient`] with enough of Vault's behaviour for the secret store:
//! mount discovery, versioned data, custom metadata and soft deletes. Every call is
//! recorded and any verb can be made to fail for paths containing a given fragment.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use vaultprov::vault::{LogicalClient, LogicalResponse, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
    Delete,
    ReadMount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Op,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct MountEntry {
    /// Prefix as it appears in request paths (`secret`)
    api_prefix: String,
    /// Path reported by mount discovery (`secret/`, or `ns1/secret/` in a namespace)
    reported: String,
    version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub data: Map<String, Value>,
    pub created_time: String,
    pub deletion_time: String,
    pub destroyed: bool,
}

impl VersionEntry {
    fn metadata(&self, version: u64) -> Value {
        json!({
            "created_time": self.created_time,
            "deletion_time": self.deletion_time,
            "destroyed": self.destroyed,
            "version": version,
        })
    }

    pub fn is_active(&self) -> bool {
        self.deletion_time.is_empty() && !self.destroyed
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecretEntry {
    pub versions: BTreeMap<u64, VersionEntry>,
    pub custom_metadata: Option<HashMap<String, String>>,
}

impl SecretEntry {
    pub fn current_version(&self) -> u64 {
        self.versions.keys().next_back().copied().unwrap_or(0)
    }

    pub fn latest(&self) -> Option<&VersionEntry> {
        self.versions.values().next_back()
    }
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    fragment: String,
    status: u16,
}

#[derive(Default)]
struct State {
    mounts: Vec<MountEntry>,
    legacy: bool,
    secrets: BTreeMap<String, SecretEntry>,
    calls: Vec<Call>,
    faults: Vec<Fault>,
    clock: u64,
}

impl State {
    fn timestamp(&mut self) -> String {
        self.clock += 1;
        format!("2024-01-01T00:00:{:02}Z", self.clock % 60)
    }

    fn check_fault(&self, op: Op, path: &str) -> Result<(), TransportError> {
        match self.faults.iter().find(|f| f.op == op && path.contains(&f.fragment)) {
            Some(fault) => Err(TransportError::status(fault.status, "injected failure")),
            None => Ok(()),
        }
    }

    /// Split an API path into the mount prefix, the segment and the secret key.
    fn route<'a>(&self, path: &'a str) -> Option<(String, &'a str, String)> {
        self.mounts.iter().find_map(|mount| {
            let rest = path.strip_prefix(&mount.api_prefix)?.strip_prefix('/')?;
            let (segment, key) = rest.split_once('/').unwrap_or((rest, ""));
            Some((mount.api_prefix.clone(), segment, key.to_string()))
        })
    }
}

pub struct InMemoryVault {
    state: Mutex<State>,
}

impl InMemoryVault {
    /// A Vault with a single KV v2 mount at `secret/`.
    pub fn new() -> Self {
        Self::empty().with_mount("secret", "secret/", Some("2"))
    }

    pub fn empty() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    pub fn with_mount(self, api_prefix: &str, reported: &str, version: Option<&str>) -> Self {
        self.state.lock().unwrap().mounts.push(MountEntry {
            api_prefix: api_prefix.to_string(),
            reported: reported.to_string(),
            version: version.map(str::to_string),
        });
        self
    }

    /// Answer mount discovery with 404, like Vault servers predating the endpoint.
    pub fn legacy(self) -> Self {
        self.state.lock().unwrap().legacy = true;
        self
    }

    pub fn fail(&self, op: Op, fragment: &str, status: u16) {
        self.state.lock().unwrap().faults.push(Fault {
            op,
            fragment: fragment.to_string(),
            status,
        });
    }

    pub fn clear_faults(&self) {
        self.state.lock().unwrap().faults.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Secret stored at logical path `path` (`secret/foo`).
    pub fn secret(&self, path: &str) -> Option<SecretEntry> {
        self.state.lock().unwrap().secrets.get(path).cloned()
    }

    pub fn custom_metadata(&self, path: &str) -> Option<HashMap<String, String>> {
        self.secret(path).and_then(|s| s.custom_metadata)
    }

    pub fn latest_data(&self, path: &str) -> Option<Map<String, Value>> {
        self.secret(path).and_then(|s| s.latest().map(|v| v.data.clone()))
    }

    pub fn active_versions(&self, path: &str) -> Vec<u64> {
        self.secret(path)
            .map(|s| s.versions.iter().filter(|(_, v)| v.is_active()).map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }

    /// Store a secret directly, bypassing the API.
    pub fn seed(&self, path: &str, data: Value, custom_metadata: Option<HashMap<String, String>>) {
        let mut state = self.state.lock().unwrap();
        let created_time = state.timestamp();
        let entry = state.secrets.entry(path.to_string()).or_default();
        let version = entry.current_version() + 1;
        entry.versions.insert(
            version,
            VersionEntry {
                data: data.as_object().cloned().unwrap_or_default(),
                created_time,
                deletion_time: String::new(),
                destroyed: false,
            },
        );
        entry.custom_metadata = custom_metadata;
    }

    /// Soft-delete the latest version as an operator would with `vault kv delete`.
    pub fn delete_latest_out_of_band(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        let deletion_time = state.timestamp();
        if let Some(latest) =
            state.secrets.get_mut(path).and_then(|s| s.versions.values_mut().next_back())
        {
            latest.deletion_time = deletion_time;
        }
    }

    pub fn remove_custom_metadata(&self, path: &str) {
        if let Some(secret) = self.state.lock().unwrap().secrets.get_mut(path) {
            secret.custom_metadata = None;
        }
    }

    fn record(&self, state: &mut State, op: Op, path: &str, body: Option<&Value>) {
        state.calls.push(Call { op, path: path.to_string(), body: body.cloned() });
    }
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

fn no_route(path: &str) -> TransportError {
    TransportError::status(404, format!("no handler for route \"{}\"", path))
}

#[async_trait]
impl LogicalClient for InMemoryVault {
    async fn read(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Op::Read, path, None);
        state.check_fault(Op::Read, path)?;

        let (prefix, segment, key) = state.route(path).ok_or_else(|| no_route(path))?;
        let logical = format!("{}/{}", prefix, key);
        let Some(secret) = state.secrets.get(&logical) else {
            return Ok(None);
        };

        match segment {
            "data" => {
                let version = secret.current_version();
                let Some(latest) = secret.latest() else {
                    return Ok(None);
                };
                let data = if latest.is_active() { Value::Object(latest.data.clone()) } else { Value::Null };
                Ok(Some(LogicalResponse::with_data(json!({
                    "data": data,
                    "metadata": latest.metadata(version),
                }))))
            }
            "metadata" => {
                let versions: Map<String, Value> = secret
                    .versions
                    .iter()
                    .map(|(n, v)| {
                        (
                            n.to_string(),
                            json!({
                                "created_time": v.created_time,
                                "deletion_time": v.deletion_time,
                                "destroyed": v.destroyed,
                            }),
                        )
                    })
                    .collect();
                Ok(Some(LogicalResponse::with_data(json!({
                    "current_version": secret.current_version(),
                    "custom_metadata": secret.custom_metadata,
                    "versions": versions,
                }))))
            }
            _ => Err(no_route(path)),
        }
    }

    async fn write(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<Option<LogicalResponse>, TransportError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Op::Write, path, Some(body));
        state.check_fault(Op::Write, path)?;

        let (prefix, segment, key) = state.route(path).ok_or_else(|| no_route(path))?;
        let logical = format!("{}/{}", prefix, key);

        match segment {
            "data" => {
                let data = body
                    .get("data")
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(|| TransportError::status(400, "no data provided"))?;
                let created_time = state.timestamp();
                let entry = state.secrets.entry(logical).or_default();
                let version = entry.current_version() + 1;
                entry.versions.insert(
                    version,
                    VersionEntry {
                        data,
                        created_time: created_time.clone(),
                        deletion_time: String::new(),
                        destroyed: false,
                    },
                );
                Ok(Some(LogicalResponse::with_data(json!({
                    "created_time": created_time,
                    "deletion_time": "",
                    "destroyed": false,
                    "version": version,
                }))))
            }
            "metadata" => {
                let custom: HashMap<String, String> = body
                    .get("custom_metadata")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|_| TransportError::status(400, "invalid custom_metadata"))?
                    .unwrap_or_default();
                state.secrets.entry(logical).or_default().custom_metadata = Some(custom);
                Ok(None)
            }
            "delete" => {
                let versions: Vec<u64> = body
                    .get("versions")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|_| TransportError::status(400, "invalid versions"))?
                    .unwrap_or_default();
                let deletion_time = state.timestamp();
                if let Some(secret) = state.secrets.get_mut(&logical) {
                    for version in versions {
                        if let Some(entry) = secret.versions.get_mut(&version) {
                            if entry.deletion_time.is_empty() {
                                entry.deletion_time = deletion_time.clone();
                            }
                        }
                    }
                }
                Ok(None)
            }
            _ => Err(no_route(path)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Op::Delete, path, None);
        state.check_fault(Op::Delete, path)?;

        let (prefix, segment, key) = state.route(path).ok_or_else(|| no_route(path))?;
        let logical = format!("{}/{}", prefix, key);
        match segment {
            "data" => {
                let deletion_time = state.timestamp();
                if let Some(latest) =
                    state.secrets.get_mut(&logical).and_then(|s| s.versions.values_mut().next_back())
                {
                    latest.deletion_time = deletion_time;
                }
                Ok(())
            }
            "metadata" => {
                state.secrets.remove(&logical);
                Ok(())
            }
            _ => Err(no_route(path)),
        }
    }

    async fn read_mount(&self, path: &str) -> Result<Option<LogicalResponse>, TransportError> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Op::ReadMount, path, None);
        state.check_fault(Op::ReadMount, path)?;

        if state.legacy {
            return Ok(None);
        }

        let mount = state
            .mounts
            .iter()
            .find(|m| path == m.api_prefix || path.starts_with(&format!("{}/", m.api_prefix)))
            .ok_or_else(|| {
                TransportError::status(400, format!("preflight capability check returned 403, please ensure client's policies grant access to path \"{}/\"", path))
            })?;

        let options = match &mount.version {
            Some(version) => json!({ "version": version }),
            None => Value::Null,
        };
        Ok(Some(LogicalResponse::with_data(json!({
            "path": mount.reported,
            "type": "kv",
            "options": options,
        }))))
    }
}

pub fn metadata(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn data(entries: &[(&str, &str)]) -> HashMap<String, Value> {
    entries.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}
