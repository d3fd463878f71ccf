//! JSON-file-backed ring-builder for tests and offline dry runs.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ringsync_types::{BuilderDevice, NewDevice, RingClass};

use crate::error::BuilderError;
use crate::traits::RingBuilder;

/// On-disk builder state kept by [`JsonBuilder`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct BuilderFile {
    part_power: u32,
    replicas: f64,
    min_part_hours: u32,
    devices: Vec<BuilderDevice>,
    /// Bumped on every rebalance so the compiled ring file changes with it.
    rebalance_count: u32,
    /// Set by `pretend_min_part_hours_passed`, cleared by the next
    /// rebalance.
    cooldown_waived: bool,
}

/// Ring-builder backend that keeps each builder file as a JSON device list.
///
/// Mirrors the file-existence behavior of the real tool: every operation
/// except `create` fails when the ring's builder file does not exist, and
/// `write_ring` emits a deterministic ring file derived from the builder
/// state. An operation log records every call for order assertions in
/// tests.
pub struct JsonBuilder {
    workdir: PathBuf,
    log: Mutex<Vec<String>>,
}

impl JsonBuilder {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every operation performed so far, in order, as `"<scope>: <op>"`
    /// where scope is the ring name or, for the device bridge, the builder
    /// file.
    pub fn operations(&self) -> Vec<String> {
        self.log.lock().expect("lock poisoned").clone()
    }

    fn record(&self, scope: impl std::fmt::Display, op: impl AsRef<str>) {
        let entry = format!("{scope}: {}", op.as_ref());
        debug!(%entry, "json builder operation");
        self.log.lock().expect("lock poisoned").push(entry);
    }

    async fn load(&self, builder_file: &str) -> Result<BuilderFile, BuilderError> {
        let path = self.workdir.join(builder_file);
        if !path.exists() {
            return Err(BuilderError::State(format!("{builder_file} does not exist")));
        }
        let content = tokio::fs::read(&path).await?;
        serde_json::from_slice(&content)
            .map_err(|e| BuilderError::State(format!("{builder_file} is corrupt: {e}")))
    }

    async fn save(&self, builder_file: &str, file: &BuilderFile) -> Result<(), BuilderError> {
        let content = serde_json::to_vec_pretty(file)
            .map_err(|e| BuilderError::State(format!("serializing builder state: {e}")))?;
        tokio::fs::write(self.workdir.join(builder_file), content).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RingBuilder for JsonBuilder {
    async fn create(
        &self,
        ring: RingClass,
        part_power: u32,
        replicas: f64,
        min_part_hours: u32,
    ) -> Result<(), BuilderError> {
        self.record(ring, format!("create {part_power} {replicas} {min_part_hours}"));
        let file = BuilderFile {
            part_power,
            replicas,
            min_part_hours,
            ..Default::default()
        };
        self.save(ring.builder_file(), &file).await
    }

    async fn search(
        &self,
        ring: RingClass,
        host: &str,
        device: &str,
    ) -> Result<bool, BuilderError> {
        self.record(ring, format!("search {host} {device}"));
        let file = self.load(ring.builder_file()).await?;
        Ok(file
            .devices
            .iter()
            .any(|d| d.ip == host && d.device == device))
    }

    async fn add(&self, ring: RingClass, device: &NewDevice) -> Result<(), BuilderError> {
        self.record(ring, format!("add {}/{}", device.ip, device.device));
        let mut file = self.load(ring.builder_file()).await?;
        let id = file.devices.iter().map(|d| d.id + 1).max().unwrap_or(0);
        file.devices.push(BuilderDevice {
            id,
            region: device.region,
            zone: device.zone,
            ip: device.ip.clone(),
            port: device.port,
            device: device.device.clone(),
            weight: device.weight,
            meta: device.meta.clone(),
        });
        self.save(ring.builder_file(), &file).await
    }

    async fn set_weight(
        &self,
        ring: RingClass,
        host: &str,
        weight: f64,
    ) -> Result<(), BuilderError> {
        self.record(ring, format!("set_weight {host} {weight}"));
        let mut file = self.load(ring.builder_file()).await?;
        let mut matched = 0;
        for dev in file.devices.iter_mut().filter(|d| d.ip == host) {
            dev.weight = weight;
            matched += 1;
        }
        if matched == 0 {
            return Err(BuilderError::State(format!(
                "no device on host {host} in {}",
                ring.builder_file()
            )));
        }
        self.save(ring.builder_file(), &file).await
    }

    async fn remove(&self, ring: RingClass, device_id: u32) -> Result<(), BuilderError> {
        self.record(ring, format!("remove d{device_id}"));
        let mut file = self.load(ring.builder_file()).await?;
        let before = file.devices.len();
        file.devices.retain(|d| d.id != device_id);
        if file.devices.len() == before {
            return Err(BuilderError::State(format!(
                "no device d{device_id} in {}",
                ring.builder_file()
            )));
        }
        self.save(ring.builder_file(), &file).await
    }

    async fn rebalance(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.record(ring, "rebalance");
        let mut file = self.load(ring.builder_file()).await?;
        file.rebalance_count += 1;
        file.cooldown_waived = false;
        self.save(ring.builder_file(), &file).await
    }

    async fn pretend_min_part_hours_passed(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.record(ring, "pretend_min_part_hours_passed");
        let mut file = self.load(ring.builder_file()).await?;
        file.cooldown_waived = true;
        self.save(ring.builder_file(), &file).await
    }

    async fn write_ring(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.record(ring, "write_ring");
        let file = self.load(ring.builder_file()).await?;
        let ring_content = serde_json::to_vec_pretty(&file)
            .map_err(|e| BuilderError::State(format!("serializing ring: {e}")))?;
        tokio::fs::write(self.workdir.join(ring.ring_file()), ring_content).await?;
        Ok(())
    }

    async fn load_devices(&self, builder_file: &str) -> Result<Vec<BuilderDevice>, BuilderError> {
        self.record(builder_file, "load_devices");
        Ok(self.load(builder_file).await?.devices)
    }

    async fn save_devices(
        &self,
        builder_file: &str,
        devices: &[BuilderDevice],
    ) -> Result<(), BuilderError> {
        self.record(builder_file, "save_devices");
        let mut file = self.load(builder_file).await?;
        for entry in devices {
            let Some(dev) = file.devices.iter_mut().find(|d| d.id == entry.id) else {
                return Err(BuilderError::State(format!(
                    "no device d{} in {builder_file}",
                    entry.id
                )));
            };
            // Same contract as the production bridge: only ip and meta are
            // ever written back.
            dev.ip = entry.ip.clone();
            dev.meta = entry.meta.clone();
        }
        self.save(builder_file, &file).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
