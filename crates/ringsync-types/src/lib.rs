//! Shared types and identifiers for ringsync.
//!
//! This crate defines the core vocabulary used across the workspace:
//! the three storage rings ([`RingClass`]), device records
//! ([`BuilderDevice`], [`NewDevice`]), the desired-device list entry
//! ([`DesiredDevice`]) with its line-oriented parser, and the well-known
//! artifact names shared between the codec and the store client.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Well-known names
// ---------------------------------------------------------------------------

/// Device name marking a logical-volume-backed device.
///
/// The external ring builder validates host addresses in a way that rejects
/// this deployment's logical-volume naming, so devices carrying this name
/// have their ip and meta fields swapped around rebalancing. See
/// `ringsync_builder::metaswap`.
pub const LVM_DEVICE: &str = "lvm";

/// Key of the bundled archive inside the shared store record's data map.
pub const BUNDLE_ARTIFACT: &str = "rings.tar.gz";

/// Directory (relative to the ring workspace) holding builder backups.
///
/// The external ring builder snapshots the previous builder state here on
/// every mutating operation; the backups travel inside the bundle so that
/// any node can roll a ring back.
pub const BACKUP_DIR: &str = "backups";

// ---------------------------------------------------------------------------
// Rings
// ---------------------------------------------------------------------------

/// One of the three data-class rings of the storage cluster.
///
/// Each ring tracks its own device set: the same physical disk appears once
/// per ring, registered under that ring's fixed service port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RingClass {
    /// Account metadata ring (port 6202).
    Account,
    /// Container metadata ring (port 6201).
    Container,
    /// Object data ring (port 6200).
    Object,
}

impl RingClass {
    /// All rings, in the order every batch operation walks them.
    pub const ALL: [RingClass; 3] = [RingClass::Account, RingClass::Container, RingClass::Object];

    /// Short lowercase name (`account`, `container`, `object`).
    pub fn name(self) -> &'static str {
        match self {
            RingClass::Account => "account",
            RingClass::Container => "container",
            RingClass::Object => "object",
        }
    }

    /// Service port devices of this ring listen on.
    pub fn port(self) -> u16 {
        match self {
            RingClass::Account => 6202,
            RingClass::Container => 6201,
            RingClass::Object => 6200,
        }
    }

    /// File name of the mutable builder state for this ring.
    pub fn builder_file(self) -> &'static str {
        match self {
            RingClass::Account => "account.builder",
            RingClass::Container => "container.builder",
            RingClass::Object => "object.builder",
        }
    }

    /// File name of the compiled ring consumed by the data path.
    pub fn ring_file(self) -> &'static str {
        match self {
            RingClass::Account => "account.ring.gz",
            RingClass::Container => "container.ring.gz",
            RingClass::Object => "object.ring.gz",
        }
    }
}

impl fmt::Display for RingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// A device entry in a ring builder's device table.
///
/// This is the shape the builder boundary speaks: the subprocess backend
/// serializes it as JSON through the helper interpreter, and the JSON
/// backend persists it directly. Within one ring a device is identified by
/// the (ip, device) pair; `id` is the builder's own device index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderDevice {
    /// Device index assigned by the builder.
    pub id: u32,
    /// Region number.
    pub region: u32,
    /// Zone number within the region.
    pub zone: u32,
    /// Host address the device is served from.
    pub ip: String,
    /// Service port (fixed per ring class).
    pub port: u16,
    /// Device name (e.g. `sdb1`, or the `lvm` sentinel).
    pub device: String,
    /// Assignment weight; 0 means drained.
    pub weight: f64,
    /// Opaque metadata string (carries the node label).
    #[serde(default)]
    pub meta: String,
}

/// Parameters for registering a new device in a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    /// Region number.
    pub region: u32,
    /// Zone number within the region.
    pub zone: u32,
    /// Host address.
    pub ip: String,
    /// Service port.
    pub port: u16,
    /// Device name.
    pub device: String,
    /// Assignment weight.
    pub weight: f64,
    /// Opaque metadata string.
    pub meta: String,
}

// ---------------------------------------------------------------------------
// Desired-device list
// ---------------------------------------------------------------------------

/// One record of the desired-device list.
///
/// The list is owned by an external provisioning process and consumed
/// read-only here; reconciliation only ever *adds* devices that are absent
/// from a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredDevice {
    /// Region number.
    pub region: u32,
    /// Zone number.
    pub zone: u32,
    /// Host address of the node carrying the device.
    pub host: String,
    /// Device name.
    pub device: String,
    /// Assignment weight.
    pub weight: f64,
    /// Node label, recorded as the device meta.
    pub label: String,
}

impl DesiredDevice {
    /// Bind this record to a ring, filling in the ring's fixed port and
    /// carrying the node label as the device meta.
    pub fn to_new_device(&self, ring: RingClass) -> NewDevice {
        NewDevice {
            region: self.region,
            zone: self.zone,
            ip: self.host.clone(),
            port: ring.port(),
            device: self.device.clone(),
            weight: self.weight,
            meta: self.label.clone(),
        }
    }
}

/// Errors from parsing the desired-device list.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A line could not be parsed.
    #[error("device list line {number}: {reason}")]
    Line {
        /// 1-based line number within the input.
        number: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Parse the line-oriented desired-device list.
///
/// Each non-empty line holds six whitespace-separated fields:
/// `region zone host device weight label`. Blank lines and lines starting
/// with `#` are skipped.
pub fn parse_device_list(input: &str) -> Result<Vec<DesiredDevice>, ParseError> {
    let mut devices = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let number = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ParseError::Line {
                number,
                reason: format!("expected 6 fields, found {}", fields.len()),
            });
        }

        devices.push(DesiredDevice {
            region: parse_field(number, "region", fields[0])?,
            zone: parse_field(number, "zone", fields[1])?,
            host: fields[2].to_string(),
            device: fields[3].to_string(),
            weight: parse_field(number, "weight", fields[4])?,
            label: fields[5].to_string(),
        });
    }

    Ok(devices)
}

fn parse_field<T: std::str::FromStr>(
    number: usize,
    name: &str,
    value: &str,
) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::Line {
        number,
        reason: format!("invalid {name}: {value:?}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
