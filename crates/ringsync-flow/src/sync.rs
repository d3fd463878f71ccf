//! The workflow driver tying store, codec, and builder together.

use std::path::PathBuf;
use std::sync::Arc;

use ringsync_builder::RingBuilder;
use ringsync_codec::{FileSet, encode_file, pack, unpack};
use ringsync_store::{ArtifactMap, StateStore};
use ringsync_types::{BUNDLE_ARTIFACT, RingClass, parse_device_list};
use tracing::{debug, info};

use crate::error::FlowError;
use crate::maintain::{drain_host, remove_device};
use crate::rebalance::{rebalance_rings, swap_file};

/// Workspace layout and builder parameters for a cluster.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Directory holding builder files, ring files, and builder backups.
    pub workspace: PathBuf,
    /// Desired-device list consumed by [`SyncFlow::update`].
    pub devices_file: PathBuf,
    /// Partition power for newly created builders.
    pub part_power: u32,
    /// Replica count for newly created builders.
    pub replicas: f64,
    /// Move cooldown, in hours, for newly created builders.
    pub min_part_hours: u32,
}

/// Drives the ring lifecycle: pull artifacts from the store, reconcile the
/// device list, rebalance, and publish the results back.
///
/// Every step operates on the workspace directory, so a failed run leaves
/// its partial state on disk for inspection — nothing is published until
/// [`SyncFlow::push`] runs.
pub struct SyncFlow {
    store: Arc<dyn StateStore>,
    builder: Arc<dyn RingBuilder>,
    options: SyncOptions,
}

impl SyncFlow {
    pub fn new(
        store: Arc<dyn StateStore>,
        builder: Arc<dyn RingBuilder>,
        options: SyncOptions,
    ) -> Self {
        Self { store, builder, options }
    }

    /// Fetch the published artifacts and unpack them into the workspace.
    ///
    /// Files already in the workspace are overwritten by their published
    /// counterparts but never deleted. Returns the number of files
    /// restored; zero when nothing has been published yet.
    pub async fn get(&self) -> Result<usize, FlowError> {
        tokio::fs::create_dir_all(&self.options.workspace).await?;

        let Some(record) = self.store.fetch().await? else {
            info!("no published record, workspace left as-is");
            return Ok(0);
        };

        let set = unpack(record.data.get(BUNDLE_ARTIFACT).map(String::as_str))?;
        set.write_to(&self.options.workspace).await?;
        info!(files = set.len(), version = %record.version, "workspace restored");
        Ok(set.len())
    }

    /// Create builders for rings that do not have one yet.
    ///
    /// A ring file without its builder means the workspace lost state that
    /// the cluster still serves from; creating a fresh builder there would
    /// produce a ring unrelated to the data layout. The whole batch is
    /// validated before any builder is created.
    pub async fn init(&self) -> Result<usize, FlowError> {
        for ring in RingClass::ALL {
            let has_builder = self.options.workspace.join(ring.builder_file()).is_file();
            let has_ring = self.options.workspace.join(ring.ring_file()).is_file();
            if has_ring && !has_builder {
                return Err(FlowError::InconsistentState { ring });
            }
        }

        let mut created = 0;
        for ring in RingClass::ALL {
            if self.options.workspace.join(ring.builder_file()).is_file() {
                debug!(%ring, "builder already present");
                continue;
            }
            self.builder
                .create(
                    ring,
                    self.options.part_power,
                    self.options.replicas,
                    self.options.min_part_hours,
                )
                .await?;
            info!(%ring, "builder created");
            created += 1;
        }
        Ok(created)
    }

    /// Reconcile the desired-device list into the builders. Returns the
    /// number of devices added across all rings.
    pub async fn update(&self) -> Result<usize, FlowError> {
        let raw = tokio::fs::read_to_string(&self.options.devices_file).await?;
        let desired = parse_device_list(&raw)?;
        debug!(
            devices = desired.len(),
            file = %self.options.devices_file.display(),
            "desired list loaded"
        );
        crate::reconcile::reconcile(self.builder.as_ref(), &desired).await
    }

    /// Rebalance all rings and regenerate their ring files.
    pub async fn rebalance(&self) -> Result<(), FlowError> {
        rebalance_rings(self.builder.as_ref(), false).await
    }

    /// Rebalance with the move cooldown lifted, for back-to-back runs
    /// after large topology changes.
    pub async fn forced_rebalance(&self) -> Result<(), FlowError> {
        rebalance_rings(self.builder.as_ref(), true).await
    }

    /// Publish the workspace artifacts to the store.
    ///
    /// All three ring files must exist; the published record carries each
    /// ring file on its own key plus the full workspace bundle. The write
    /// is conditional on the version observed here, so a concurrent
    /// publisher fails the slower side instead of being overwritten.
    pub async fn push(&self) -> Result<(), FlowError> {
        let set = FileSet::read_dir_artifacts(&self.options.workspace).await?;

        let mut data = ArtifactMap::new();
        for ring in RingClass::ALL {
            let Some(content) = set.get(ring.ring_file()) else {
                return Err(FlowError::MissingRingFile { ring });
            };
            data.insert(ring.ring_file().to_string(), encode_file(content));
        }
        data.insert(BUNDLE_ARTIFACT.to_string(), pack(&set)?);

        let version = self.store.fetch().await?.map(|record| record.version);
        self.store.publish(version.as_deref(), data).await?;
        info!(files = set.len(), "artifacts published");
        Ok(())
    }

    /// The full cycle: get, init, update, rebalance, push.
    pub async fn all(&self) -> Result<(), FlowError> {
        self.get().await?;
        self.init().await?;
        let added = self.update().await?;
        info!(added, "reconciled device list");
        self.rebalance().await?;
        self.push().await
    }

    /// Zero the weight of every device on `host` across all rings.
    pub async fn drain(&self, host: &str) -> Result<(), FlowError> {
        drain_host(self.builder.as_ref(), host).await
    }

    /// Remove a device from all rings by its id.
    pub async fn remove(&self, device_id: u32) -> Result<(), FlowError> {
        remove_device(self.builder.as_ref(), device_id).await
    }

    /// Swap logical-volume addresses in one builder file, in place.
    /// Running it twice restores the original table.
    pub async fn metaswap(&self, builder_file: &str) -> Result<usize, FlowError> {
        let swapped = swap_file(self.builder.as_ref(), builder_file).await?;
        info!(builder_file, swapped, "address swap applied");
        Ok(swapped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
