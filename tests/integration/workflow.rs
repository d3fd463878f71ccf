//! Integration test: the sync workflow end to end.
//!
//! Full cycles against an in-memory store with the JSON builder backend:
//! bootstrap from an empty store, convergence between two workspaces,
//! idempotent reruns, and refusal to reinitialize damaged workspaces.

use std::sync::Arc;

use ringsync_codec::{FileSet, pack};
use ringsync_flow::FlowError;
use ringsync_integration_tests::TestBed;
use ringsync_store::{ArtifactMap, MemoryStateStore, StateStore};
use ringsync_types::{BUNDLE_ARTIFACT, RingClass};

/// Fresh cluster: empty store, empty workspace. One full cycle must
/// create the builders, add every desired device, rebalance, and publish
/// the first record.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_bootstrap_cycle_from_empty_store() {
    let bed = TestBed::new().await;

    bed.flow.all().await.unwrap();

    let record = bed.store.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "1");
    let keys: Vec<&str> = record.data.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "account.ring.gz",
            "container.ring.gz",
            "object.ring.gz",
            BUNDLE_ARTIFACT,
        ]
    );

    // Builder and ring files exist for every ring.
    for ring in RingClass::ALL {
        assert!(bed.workspace_file(ring.builder_file()).is_file(), "{ring}");
        assert!(bed.workspace_file(ring.ring_file()).is_file(), "{ring}");
    }

    // The address swap was undone before publishing: device tables carry
    // real addresses, labels stay in the meta field.
    for table in bed.device_tables().await {
        assert_eq!(table.len(), 4);
        for dev in &table {
            assert!(dev.ip.starts_with("10.0.0."), "{}", dev.ip);
            assert!(dev.meta.starts_with("node-"), "{}", dev.meta);
        }
    }
}

/// A desired device lands in all three rings, with the ring's fixed port
/// and the node label as the device meta.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_update_lands_devices_in_all_rings() {
    let bed = TestBed::new().await;
    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();

    let added = bed.flow.update().await.unwrap();
    assert_eq!(added, 12, "4 desired devices x 3 rings");

    let tables = bed.device_tables().await;
    for (table, port) in tables.iter().zip([6202u16, 6201, 6200]) {
        assert_eq!(table.len(), 4);
        for dev in table {
            assert_eq!(dev.port, port);
        }
        let lvm = table
            .iter()
            .find(|dev| dev.device == "lvm" && dev.ip == "10.0.0.5")
            .unwrap();
        assert_eq!(lvm.meta, "node-a");
        assert_eq!(lvm.weight, 100.0);
    }
}

/// A second `update` with the same list adds nothing and leaves the
/// builder files byte-identical.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_update_is_idempotent() {
    let bed = TestBed::new().await;
    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();
    bed.flow.update().await.unwrap();

    let before = bed.builder_bytes().await;
    assert_eq!(bed.flow.update().await.unwrap(), 0);
    assert_eq!(bed.builder_bytes().await, before);
}

/// A drifted list never mutates devices already in the rings: changed
/// weights are ignored, only genuinely new devices are added.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_update_never_mutates_existing_devices() {
    let bed = TestBed::new().await;
    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();
    bed.flow.update().await.unwrap();

    bed.write_devices(
        "\
1 1 10.0.0.5 lvm  50  node-a
1 3 10.0.0.7 sdb1 200 node-c
",
    )
    .await;

    assert_eq!(bed.flow.update().await.unwrap(), 3, "only the new host");

    for table in bed.device_tables().await {
        let existing = table
            .iter()
            .find(|dev| dev.device == "lvm" && dev.ip == "10.0.0.5")
            .unwrap();
        assert_eq!(existing.weight, 100.0, "weight drift must not apply");

        let new = table.iter().find(|dev| dev.ip == "10.0.0.7").unwrap();
        assert_eq!(new.weight, 200.0);
        assert_eq!(new.meta, "node-c");
    }
}

/// A second operator workspace converges: `get` restores exactly the
/// builder files the first workspace pushed, and there is nothing left
/// for init or update to do.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_two_workspaces_converge() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    let peer = TestBed::with_store(bed.store.clone()).await;
    let restored = peer.flow.get().await.unwrap();
    assert!(restored >= 6, "three builders and three ring files");
    assert_eq!(peer.builder_bytes().await, bed.builder_bytes().await);

    assert_eq!(peer.flow.init().await.unwrap(), 0);
    assert_eq!(peer.flow.update().await.unwrap(), 0);
}

/// Rerunning the full cycle publishes a new version each time and keeps
/// the artifact key set stable.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_repeated_cycles_bump_version() {
    let bed = TestBed::new().await;

    bed.flow.all().await.unwrap();
    bed.flow.all().await.unwrap();

    let record = bed.store.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "2");
    assert_eq!(record.data.len(), 4);
}

/// A published bundle carrying ring files but no builders (a damaged or
/// hand-rolled record) must stop `init` before it creates anything.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_init_refuses_restored_half_state() {
    let store = Arc::new(MemoryStateStore::new());
    let mut files = FileSet::new();
    for ring in RingClass::ALL {
        files.insert_file(ring.ring_file(), b"ring without builder".to_vec());
    }
    let mut data = ArtifactMap::new();
    data.insert(BUNDLE_ARTIFACT.to_string(), pack(&files).unwrap());
    store.publish(None, data).await.unwrap();

    let bed = TestBed::with_store(store).await;
    assert_eq!(bed.flow.get().await.unwrap(), 3);

    let err = bed.flow.init().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::InconsistentState {
            ring: RingClass::Account
        }
    ));
    for ring in RingClass::ALL {
        assert!(
            !bed.workspace_file(ring.builder_file()).is_file(),
            "{ring} builder must not be created"
        );
    }
}

/// `metaswap` rewrites only logical-volume devices, and a second pass
/// restores the builder file byte for byte.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_metaswap_round_trip_on_disk() {
    let bed = TestBed::new().await;
    bed.flow.get().await.unwrap();
    bed.flow.init().await.unwrap();
    bed.flow.update().await.unwrap();

    let before = bed.read_file("container.builder").await;

    assert_eq!(bed.flow.metaswap("container.builder").await.unwrap(), 2);
    let swapped = bed.read_file("container.builder").await;
    assert_ne!(swapped, before);

    let table = bed.device_tables().await.remove(1);
    let lvm = table.iter().find(|dev| dev.meta == "10.0.0.5").unwrap();
    assert_eq!(lvm.ip, "node-a", "address and label trade places");

    assert_eq!(bed.flow.metaswap("container.builder").await.unwrap(), 2);
    assert_eq!(bed.read_file("container.builder").await, before);
}
