//! Shared test harness for ringsync integration tests.
//!
//! Provides [`TestBed`] — a temp workspace with a [`SyncFlow`] wired to
//! the JSON ring builder and an in-memory state store, so full workflows
//! run without an API server or the external ring-builder tool.

use std::path::PathBuf;
use std::sync::Arc;

use ringsync_builder::{JsonBuilder, RingBuilder};
use ringsync_flow::{SyncFlow, SyncOptions};
use ringsync_store::{MemoryStateStore, StateStore};
use ringsync_types::{BuilderDevice, RingClass};
use tempfile::TempDir;

/// Device list used by most tests: two hosts, one logical volume and one
/// plain disk each.
pub const SAMPLE_DEVICES: &str = "\
# region zone host      device weight label
1        1    10.0.0.5  lvm    100    node-a
1        1    10.0.0.5  sdb1   100    node-a
1        2    10.0.0.6  lvm    100    node-b
1        2    10.0.0.6  sdb1   100    node-b
";

// =========================================================================
// TestBed
// =========================================================================

/// One simulated operator: a ring workspace, a device list, and a
/// workflow driver against a state store.
///
/// Beds constructed over the same store simulate multiple operators
/// working against the same cluster record.
pub struct TestBed {
    /// Keeps the temp directory alive for the bed's lifetime.
    _root: TempDir,
    pub store: Arc<dyn StateStore>,
    pub builder: Arc<JsonBuilder>,
    pub flow: SyncFlow,
    workspace: PathBuf,
    devices_file: PathBuf,
}

impl TestBed {
    /// A bed with its own fresh in-memory store.
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStateStore::new())).await
    }

    /// A bed over an existing store, seeded with [`SAMPLE_DEVICES`].
    pub async fn with_store(store: Arc<dyn StateStore>) -> Self {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("rings");
        let devices_file = root.path().join("devices.txt");
        tokio::fs::write(&devices_file, SAMPLE_DEVICES).await.unwrap();

        let builder = Arc::new(JsonBuilder::new(&workspace));
        let flow = SyncFlow::new(
            store.clone(),
            builder.clone(),
            SyncOptions {
                workspace: workspace.clone(),
                devices_file: devices_file.clone(),
                part_power: 10,
                replicas: 3.0,
                min_part_hours: 1,
            },
        );

        Self {
            _root: root,
            store,
            builder,
            flow,
            workspace,
            devices_file,
        }
    }

    /// Replace the desired-device list.
    pub async fn write_devices(&self, content: &str) {
        tokio::fs::write(&self.devices_file, content).await.unwrap();
    }

    /// Absolute path of a file inside the ring workspace.
    pub fn workspace_file(&self, name: &str) -> PathBuf {
        self.workspace.join(name)
    }

    /// Read a workspace file.
    pub async fn read_file(&self, name: &str) -> Vec<u8> {
        tokio::fs::read(self.workspace_file(name)).await.unwrap()
    }

    /// Device tables of all three builders, in account, container, object
    /// order.
    pub async fn device_tables(&self) -> Vec<Vec<BuilderDevice>> {
        let mut tables = Vec::new();
        for ring in RingClass::ALL {
            tables.push(self.builder.load_devices(ring.builder_file()).await.unwrap());
        }
        tables
    }

    /// Raw bytes of all three builder files, for byte-identity assertions.
    pub async fn builder_bytes(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for ring in RingClass::ALL {
            out.push(self.read_file(ring.builder_file()).await);
        }
        out
    }
}
