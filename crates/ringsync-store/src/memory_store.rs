//! In-memory ring-state store backend.

use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;
use crate::traits::{ArtifactMap, StateRecord, StateStore};

/// In-memory store with real create/update/conflict semantics.
///
/// Useful for tests and offline dry runs. The version is a plain counter:
/// create installs version 1, every successful update bumps it, and a
/// publish carrying any other version is rejected exactly like the
/// production backend rejects a stale `resourceVersion`.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<(u64, ArtifactMap)>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn fetch(&self) -> Result<Option<StateRecord>, StoreError> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(state.as_ref().map(|(version, data)| StateRecord {
            version: version.to_string(),
            data: data.clone(),
        }))
    }

    async fn publish(&self, version: Option<&str>, data: ArtifactMap) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("lock poisoned");
        match (version, state.as_mut()) {
            (None, None) => {
                debug!(entries = data.len(), "created in-memory ring state");
                *state = Some((1, data));
                Ok(())
            }
            (None, Some(_)) => Err(StoreError::VersionConflict {
                detail: "record already exists".to_string(),
            }),
            (Some(_), None) => Err(StoreError::VersionConflict {
                detail: "record does not exist".to_string(),
            }),
            (Some(claimed), Some((current, stored))) => {
                if claimed != current.to_string() {
                    return Err(StoreError::VersionConflict {
                        detail: format!("store is at version {current}, publish claimed {claimed}"),
                    });
                }
                *current += 1;
                *stored = data;
                debug!(version = *current, entries = stored.len(), "updated in-memory ring state");
                Ok(())
            }
        }
    }
}
