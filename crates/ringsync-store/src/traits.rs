//! Core trait and types for the ring-state store.

use std::collections::BTreeMap;

use crate::error::StoreError;

/// Artifact name → base64 content, as carried by the store record.
///
/// The values are stored exactly as published; the codec layer owns the
/// encoding. Ordered so that serialized records are stable.
pub type ArtifactMap = BTreeMap<String, String>;

/// One observed ring-state record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    /// Store-assigned version at the time of the read. A publish that
    /// carries a stale version is rejected with
    /// [`StoreError::VersionConflict`].
    pub version: String,
    /// The record's artifact entries.
    pub data: ArtifactMap,
}

/// Trait for reading and publishing the shared ring-state record.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// There is exactly one record per deployment; the trait has no notion of
/// keys beyond the artifact names inside the record.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Read the current record. Returns `None` if it has never been
    /// published, which is valid fresh state.
    async fn fetch(&self) -> Result<Option<StateRecord>, StoreError>;

    /// Publish a new record state.
    ///
    /// `version: None` creates the record and fails with
    /// [`StoreError::VersionConflict`] if it already exists. `Some`
    /// replaces the record and fails the same way if the store has moved
    /// past that version. The whole map is written in one call; readers
    /// never observe a partially updated record.
    async fn publish(&self, version: Option<&str>, data: ArtifactMap) -> Result<(), StoreError>;
}
