//! The ip/meta field swap applied around rebalancing.

use ringsync_types::{BuilderDevice, LVM_DEVICE};

/// Swap the `ip` and `meta` fields of every logical-volume device.
///
/// The external tool validates device addresses in a way that rejects the
/// node-label addressing used for logical-volume devices, so those entries
/// are swapped into a form it accepts before rebalancing and swapped back
/// afterwards. A device qualifies when its device name is the `lvm`
/// sentinel and its meta is non-empty; applying the transform twice
/// restores the original table.
///
/// Returns the number of devices swapped.
pub fn metaswap(devices: &mut [BuilderDevice]) -> usize {
    let mut swapped = 0;
    for dev in devices {
        if dev.device == LVM_DEVICE && !dev.meta.is_empty() {
            std::mem::swap(&mut dev.ip, &mut dev.meta);
            swapped += 1;
        }
    }
    swapped
}
