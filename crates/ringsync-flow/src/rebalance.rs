//! Rebalance orchestration with the address-swap workaround.

use ringsync_builder::{BuilderError, RingBuilder, metaswap};
use ringsync_types::RingClass;
use tracing::{debug, info};

use crate::error::FlowError;

/// Run the rebalance sequence for every ring, strictly in order:
/// swap addresses, rebalance, swap back, write the ring file. The batch
/// aborts on the first failure; later rings are not attempted.
///
/// `forced` lifts the move cooldown for every ring before the batch runs.
pub(crate) async fn rebalance_rings(
    builder: &dyn RingBuilder,
    forced: bool,
) -> Result<(), FlowError> {
    if forced {
        for ring in RingClass::ALL {
            builder.pretend_min_part_hours_passed(ring).await?;
        }
        info!("move cooldown lifted for all rings");
    }

    for ring in RingClass::ALL {
        let swapped = swap_file(builder, ring.builder_file()).await?;
        debug!(%ring, swapped, "applied address swap");

        if let Err(source) = builder.rebalance(ring).await {
            return Err(swap_abort(ring, swapped, source));
        }

        if swapped > 0 {
            // Involution: the same transform restores the original table.
            match swap_file(builder, ring.builder_file()).await {
                Ok(_) => {}
                Err(FlowError::Builder(source)) => {
                    return Err(FlowError::SwappedAbort { ring, source });
                }
                Err(other) => return Err(other),
            }
        }

        builder.write_ring(ring).await?;
        info!(%ring, "rebalanced and wrote ring file");
    }

    Ok(())
}

/// Load a builder file's device table, swap logical-volume addresses, and
/// save it back. Saving is skipped when nothing qualified for the swap.
///
/// Returns the number of devices swapped.
pub(crate) async fn swap_file(
    builder: &dyn RingBuilder,
    builder_file: &str,
) -> Result<usize, FlowError> {
    let mut devices = builder.load_devices(builder_file).await?;
    let swapped = metaswap(&mut devices);
    if swapped > 0 {
        builder.save_devices(builder_file, &devices).await?;
    }
    Ok(swapped)
}

fn swap_abort(ring: RingClass, swapped: usize, source: BuilderError) -> FlowError {
    if swapped > 0 {
        FlowError::SwappedAbort { ring, source }
    } else {
        FlowError::Builder(source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
