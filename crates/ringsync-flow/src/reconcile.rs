//! Reconciliation of the desired-device list against the rings.

use ringsync_builder::RingBuilder;
use ringsync_types::{DesiredDevice, RingClass};
use tracing::{debug, info};

use crate::error::FlowError;

/// Add every desired device that is absent from a ring.
///
/// A device is matched by (host, device name) within each ring. Present
/// devices are never touched: weight, zone and meta drift are left for
/// the explicit maintenance operations, not applied silently here.
/// Re-running with an unchanged list is a no-op.
///
/// Returns the total number of devices added across all rings.
pub(crate) async fn reconcile(
    builder: &dyn RingBuilder,
    desired: &[DesiredDevice],
) -> Result<usize, FlowError> {
    let mut total = 0;
    for ring in RingClass::ALL {
        let mut added = 0;
        for record in desired {
            if builder.search(ring, &record.host, &record.device).await? {
                continue;
            }
            info!(
                %ring,
                host = %record.host,
                device = %record.device,
                weight = record.weight,
                label = %record.label,
                "registering device"
            );
            builder.add(ring, &record.to_new_device(ring)).await?;
            added += 1;
        }
        if added > 0 {
            info!(%ring, added, "devices added");
        } else {
            debug!(%ring, "already matches the desired list");
        }
        total += added;
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
