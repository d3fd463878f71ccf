//! Fleet maintenance: draining hosts and removing dead devices.

use ringsync_builder::RingBuilder;
use ringsync_types::RingClass;
use tracing::info;

use crate::error::FlowError;

/// Zero the weight of every device on `host` in all three rings. Data
/// migrates off the host on the next rebalance; the devices stay in the
/// ring until they are removed.
pub(crate) async fn drain_host(builder: &dyn RingBuilder, host: &str) -> Result<(), FlowError> {
    for ring in RingClass::ALL {
        builder.set_weight(ring, host, 0.0).await?;
        info!(%ring, host, "weight set to 0");
    }
    Ok(())
}

/// Remove device `device_id` from all three rings. The id is shared across
/// rings when the fleet was built through the reconciler, which adds
/// devices to every ring in the same order.
pub(crate) async fn remove_device(
    builder: &dyn RingBuilder,
    device_id: u32,
) -> Result<(), FlowError> {
    for ring in RingClass::ALL {
        builder.remove(ring, device_id).await?;
        info!(%ring, device_id, "device removed");
    }
    Ok(())
}
