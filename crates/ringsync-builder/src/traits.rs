//! Core trait for driving the external ring builder.

use ringsync_types::{BuilderDevice, NewDevice, RingClass};

use crate::error::BuilderError;

/// Operations the workflow needs from a ring-builder backend.
///
/// Every operation targets one ring's builder file inside the workspace
/// directory the backend was constructed with. All implementations must be
/// `Send + Sync` for use across async tasks.
#[async_trait::async_trait]
pub trait RingBuilder: Send + Sync {
    /// Create a fresh builder file for `ring`.
    async fn create(
        &self,
        ring: RingClass,
        part_power: u32,
        replicas: f64,
        min_part_hours: u32,
    ) -> Result<(), BuilderError>;

    /// Whether a device with this host and device name is registered.
    async fn search(&self, ring: RingClass, host: &str, device: &str)
    -> Result<bool, BuilderError>;

    /// Register a new device.
    async fn add(&self, ring: RingClass, device: &NewDevice) -> Result<(), BuilderError>;

    /// Set the weight of every device on `host`.
    async fn set_weight(&self, ring: RingClass, host: &str, weight: f64)
    -> Result<(), BuilderError>;

    /// Remove the device with the given builder id.
    async fn remove(&self, ring: RingClass, device_id: u32) -> Result<(), BuilderError>;

    /// Reassign partitions across the current device set.
    async fn rebalance(&self, ring: RingClass) -> Result<(), BuilderError>;

    /// Lift the move-cooldown restriction for the next rebalance.
    async fn pretend_min_part_hours_passed(&self, ring: RingClass) -> Result<(), BuilderError>;

    /// Write the compiled ring file next to the builder file.
    async fn write_ring(&self, ring: RingClass) -> Result<(), BuilderError>;

    /// Read the device table of a builder file in the workspace.
    ///
    /// Takes the file name rather than a ring so the swap workaround can
    /// also be applied to arbitrary builder files (backups, manual
    /// repair).
    async fn load_devices(&self, builder_file: &str) -> Result<Vec<BuilderDevice>, BuilderError>;

    /// Write device entries back into a builder file.
    ///
    /// Only the `ip` and `meta` fields are applied; everything else in the
    /// builder state is left untouched.
    async fn save_devices(
        &self,
        builder_file: &str,
        devices: &[BuilderDevice],
    ) -> Result<(), BuilderError>;
}
