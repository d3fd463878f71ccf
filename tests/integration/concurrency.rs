//! Integration test: concurrent publishers.
//!
//! The store's version check is the only coordination between operators:
//! a stale publish must surface as a conflict, never retry on its own,
//! and leave the workspace ready for an operator-driven rerun.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ringsync_flow::FlowError;
use ringsync_integration_tests::TestBed;
use ringsync_store::{ArtifactMap, MemoryStateStore, StateRecord, StateStore, StoreError};
use ringsync_types::RingClass;

/// Forwards to an inner store, but a competing publisher lands between
/// the first publish's version check and its write.
struct ContendedStore {
    inner: Arc<MemoryStateStore>,
    raced: AtomicBool,
}

impl ContendedStore {
    fn new(inner: Arc<MemoryStateStore>) -> Self {
        Self {
            inner,
            raced: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StateStore for ContendedStore {
    async fn fetch(&self) -> Result<Option<StateRecord>, StoreError> {
        self.inner.fetch().await
    }

    async fn publish(&self, version: Option<&str>, data: ArtifactMap) -> Result<(), StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let current = self.inner.fetch().await?;
            let mut competing = ArtifactMap::new();
            competing.insert("winner".to_string(), "competitor".to_string());
            self.inner
                .publish(current.as_ref().map(|record| record.version.as_str()), competing)
                .await?;
        }
        self.inner.publish(version, data).await
    }
}

/// A push that loses the publish race surfaces the conflict and the
/// competitor's record stands untouched.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_losing_publish_race_surfaces_conflict() {
    let inner = Arc::new(MemoryStateStore::new());
    let bed = TestBed::with_store(Arc::new(ContendedStore::new(inner.clone()))).await;

    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();
    bed.flow.update().await.unwrap();
    bed.flow.rebalance().await.unwrap();

    let err = bed.flow.push().await.unwrap_err();
    match err {
        FlowError::Store(StoreError::VersionConflict { .. }) => {}
        other => panic!("unexpected error: {other:?}"),
    }

    let record = inner.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "1");
    assert_eq!(
        record.data.get("winner").map(String::as_str),
        Some("competitor")
    );
}

/// Losing the race leaves the workspace intact; rerunning `push` picks
/// up the competitor's version and lands on top of it.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_push_rerun_after_conflict_succeeds() {
    let inner = Arc::new(MemoryStateStore::new());
    let bed = TestBed::with_store(Arc::new(ContendedStore::new(inner.clone()))).await;

    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();
    bed.flow.update().await.unwrap();
    bed.flow.rebalance().await.unwrap();

    bed.flow.push().await.unwrap_err();

    // The workspace kept every artifact.
    for ring in RingClass::ALL {
        assert!(bed.workspace_file(ring.builder_file()).is_file(), "{ring}");
        assert!(bed.workspace_file(ring.ring_file()).is_file(), "{ring}");
    }

    // The rerun fetches the competitor's version and replaces the record.
    bed.flow.push().await.unwrap();

    let record = inner.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "2");
    assert_eq!(record.data.len(), 4);
    assert!(!record.data.contains_key("winner"));
}
