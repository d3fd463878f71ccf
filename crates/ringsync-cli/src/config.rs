//! TOML configuration for the ringsync binary.
//!
//! Every section is optional; the defaults target an in-cluster run with
//! the mounted service-account credentials and a `swift-ring-builder` on
//! the PATH.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ringsync_flow::SyncOptions;
use ringsync_store::{HttpStoreOptions, OwnerReference};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Shared state store endpoint and credentials.
    pub store: StoreSection,
    /// Owner reference attached to the published record.
    pub owner: OwnerSection,
    /// Ring workspace and builder parameters.
    pub rings: RingsSection,
    /// Ring-builder subprocess selection.
    pub builder: BuilderSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[store]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// API server base URL.
    pub api_url: String,
    /// Name of the record holding the ring artifacts.
    pub record: String,
    /// Directory with `token`, `namespace`, and optionally `ca.crt`.
    pub credentials_dir: PathBuf,
    /// Namespace override. When empty, the namespace is read from
    /// `credentials_dir`.
    pub namespace: String,
    /// Finalizer attached to the record on creation.
    pub finalizer: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            api_url: "https://kubernetes.default.svc".to_string(),
            record: "ring-state".to_string(),
            credentials_dir: PathBuf::from("/var/run/secrets/kubernetes.io/serviceaccount"),
            namespace: String::new(),
            finalizer: "ringsync.dev/ring-state".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// `[owner]` section.
///
/// When all four fields are set, the published record carries an owner
/// reference and is garbage-collected with its owner.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OwnerSection {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// `[rings]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RingsSection {
    /// Workspace directory for builder files, ring files, and backups.
    pub dir: PathBuf,
    /// Desired-device list consumed by `update`.
    pub devices: PathBuf,
    /// Partition power for newly created builders.
    pub part_power: u32,
    /// Replica count for newly created builders.
    pub replicas: f64,
    /// Move cooldown, in hours, for newly created builders.
    pub min_part_hours: u32,
}

impl Default for RingsSection {
    fn default() -> Self {
        let dir = dirs::home_dir()
            .map(|h| h.join(".ringsync").join("rings"))
            .unwrap_or_else(|| PathBuf::from(".ringsync/rings"));
        Self {
            dir,
            devices: PathBuf::from("devices.txt"),
            part_power: 10,
            replicas: 3.0,
            min_part_hours: 1,
        }
    }
}

/// `[builder]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuilderSection {
    /// Backend type: `"command"` (default) or `"json"`.
    ///
    /// The JSON backend keeps the device tables in plain JSON files and
    /// needs no external tools; it exists for dry runs and tests.
    pub backend: String,
    /// Ring-builder executable.
    pub program: String,
    /// Python interpreter used to read and write builder files directly.
    pub helper: String,
}

impl Default for BuilderSection {
    fn default() -> Self {
        Self {
            backend: "command".to_string(),
            program: "swift-ring-builder".to_string(),
            helper: "python3".to_string(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Store client options assembled from the `[store]` and `[owner]`
    /// sections.
    pub fn store_options(&self) -> HttpStoreOptions {
        HttpStoreOptions {
            api_url: self.store.api_url.clone(),
            record: self.store.record.clone(),
            credentials_dir: self.store.credentials_dir.clone(),
            namespace: (!self.store.namespace.is_empty()).then(|| self.store.namespace.clone()),
            finalizer: self.store.finalizer.clone(),
            owner: self.owner_reference(),
            request_timeout: Duration::from_secs(self.store.request_timeout_secs),
        }
    }

    /// Owner reference from the `[owner]` section, if fully specified.
    pub fn owner_reference(&self) -> Option<OwnerReference> {
        let o = &self.owner;
        if o.api_version.is_empty() || o.kind.is_empty() || o.name.is_empty() || o.uid.is_empty() {
            return None;
        }
        Some(OwnerReference {
            api_version: o.api_version.clone(),
            kind: o.kind.clone(),
            name: o.name.clone(),
            uid: o.uid.clone(),
        })
    }

    /// Workflow options from the `[rings]` section.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            workspace: self.rings.dir.clone(),
            devices_file: self.rings.devices.clone(),
            part_power: self.rings.part_power,
            replicas: self.rings.replicas,
            min_part_hours: self.rings.min_part_hours,
        }
    }
}
