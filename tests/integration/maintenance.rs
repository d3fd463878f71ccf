//! Integration test: fleet maintenance.
//!
//! Draining hosts and removing devices through the workflow driver, and
//! how those edits reach other workspaces.

use ringsync_flow::FlowError;
use ringsync_integration_tests::TestBed;
use ringsync_store::StateStore;

/// Drain zeroes the weight of every device on the host, in every ring,
/// and keeps the entries in place.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_drain_zeroes_weights_everywhere() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    bed.flow.drain("10.0.0.5").await.unwrap();

    for table in bed.device_tables().await {
        assert_eq!(table.len(), 4, "drained devices stay in the ring");
        for dev in &table {
            let expected = if dev.ip == "10.0.0.5" { 0.0 } else { 100.0 };
            assert_eq!(dev.weight, expected, "{}/{}", dev.ip, dev.device);
        }
    }
}

/// Drained weights reach a peer workspace once the drain is rebalanced
/// and pushed.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_drained_weights_reach_peers() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    bed.flow.drain("10.0.0.6").await.unwrap();
    bed.flow.forced_rebalance().await.unwrap();
    bed.flow.push().await.unwrap();

    let peer = TestBed::with_store(bed.store.clone()).await;
    peer.flow.get().await.unwrap();

    for table in peer.device_tables().await {
        for dev in table.iter().filter(|dev| dev.ip == "10.0.0.6") {
            assert_eq!(dev.weight, 0.0);
        }
    }
}

/// Remove drops the device from every ring; removing it again fails, and
/// nothing reaches the store until a push.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_remove_is_local_until_pushed() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    bed.flow.remove(0).await.unwrap();

    for table in bed.device_tables().await {
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|dev| dev.id != 0));
    }

    let err = bed.flow.remove(0).await.unwrap_err();
    assert!(matches!(err, FlowError::Builder(_)));

    // Maintenance edits the workspace only; the published record still
    // has the bootstrap version.
    let record = bed.store.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "1");
}

/// Draining an address that is in no ring fails without touching the
/// builder files.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_drain_unknown_host_changes_nothing() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    let before = bed.builder_bytes().await;
    let err = bed.flow.drain("10.9.9.9").await.unwrap_err();
    assert!(matches!(err, FlowError::Builder(_)));
    assert_eq!(bed.builder_bytes().await, before);
}

/// The full decommission path: drain, rebalance, remove, rebalance, push.
/// The final record carries rings without the host.
#[tokio::test]
#[ntest::timeout(10000)]
async fn test_decommission_path() {
    let bed = TestBed::new().await;
    bed.flow.all().await.unwrap();

    bed.flow.drain("10.0.0.5").await.unwrap();
    bed.flow.forced_rebalance().await.unwrap();

    // SAMPLE_DEVICES lists 10.0.0.5's devices first, so they hold ids 0
    // and 1 in every ring.
    bed.flow.remove(0).await.unwrap();
    bed.flow.remove(1).await.unwrap();
    bed.flow.forced_rebalance().await.unwrap();
    bed.flow.push().await.unwrap();

    let peer = TestBed::with_store(bed.store.clone()).await;
    peer.flow.get().await.unwrap();
    for table in peer.device_tables().await {
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|dev| dev.ip == "10.0.0.6"));
    }

    let record = bed.store.fetch().await.unwrap().unwrap();
    assert_eq!(record.version, "2");
}
