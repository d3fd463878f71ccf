//! Subprocess-backed ring-builder operations.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use ringsync_types::{BuilderDevice, NewDevice, RingClass};

use crate::error::BuilderError;
use crate::traits::RingBuilder;

/// Script run by the helper interpreter to dump a ring's device table as
/// JSON on stdout. Takes the builder file as its only argument.
const DUMP_SCRIPT: &str = r#"
import json, sys
from swift.common.ring import RingBuilder
builder = RingBuilder.load(sys.argv[1])
devs = [
    {
        "id": d["id"],
        "region": d["region"],
        "zone": d["zone"],
        "ip": d["ip"],
        "port": d["port"],
        "device": d["device"],
        "weight": d["weight"],
        "meta": d.get("meta", ""),
    }
    for d in builder.devs
    if d is not None
]
json.dump(devs, sys.stdout)
"#;

/// Script run by the helper interpreter to apply a JSON device list from
/// stdin back onto the builder state. Only `ip` and `meta` are written,
/// the two fields the swap workaround touches.
const APPLY_SCRIPT: &str = r#"
import json, sys
from swift.common.ring import RingBuilder
builder = RingBuilder.load(sys.argv[1])
by_id = {d["id"]: d for d in builder.devs if d is not None}
for entry in json.load(sys.stdin):
    dev = by_id[entry["id"]]
    dev["ip"] = entry["ip"]
    dev["meta"] = entry["meta"]
builder.save(sys.argv[1])
"#;

// ---------------------------------------------------------------------------
// Argument construction
// ---------------------------------------------------------------------------

// Kept as plain functions so the exact command lines stay unit-testable
// without spawning anything.

fn create_args(ring: RingClass, part_power: u32, replicas: f64, min_part_hours: u32) -> Vec<String> {
    vec![
        ring.builder_file().to_string(),
        "create".to_string(),
        part_power.to_string(),
        replicas.to_string(),
        min_part_hours.to_string(),
    ]
}

fn search_args(ring: RingClass, host: &str, device: &str) -> Vec<String> {
    vec![
        ring.builder_file().to_string(),
        "search".to_string(),
        "--ip".to_string(),
        host.to_string(),
        "--device".to_string(),
        device.to_string(),
    ]
}

fn add_args(ring: RingClass, device: &NewDevice) -> Vec<String> {
    vec![
        ring.builder_file().to_string(),
        "add".to_string(),
        "--region".to_string(),
        device.region.to_string(),
        "--zone".to_string(),
        device.zone.to_string(),
        "--ip".to_string(),
        device.ip.clone(),
        "--port".to_string(),
        device.port.to_string(),
        "--device".to_string(),
        device.device.clone(),
        "--meta".to_string(),
        device.meta.clone(),
        "--weight".to_string(),
        device.weight.to_string(),
    ]
}

fn set_weight_args(ring: RingClass, host: &str, weight: f64) -> Vec<String> {
    vec![
        ring.builder_file().to_string(),
        "set_weight".to_string(),
        "--ip".to_string(),
        host.to_string(),
        "--yes".to_string(),
        weight.to_string(),
    ]
}

fn remove_args(ring: RingClass, device_id: u32) -> Vec<String> {
    vec![
        ring.builder_file().to_string(),
        "remove".to_string(),
        format!("d{device_id}"),
        "--yes".to_string(),
    ]
}

fn plain_args(ring: RingClass, subcommand: &str) -> Vec<String> {
    vec![ring.builder_file().to_string(), subcommand.to_string()]
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Production backend shelling out to the external ring-builder program.
///
/// Every operation runs the program in the ring workspace directory with
/// the ring's builder file as a relative path, the way an operator would
/// run it by hand. `search` distinguishes "not registered" (exit 2) from
/// real failures; every other operation requires exit 0.
pub struct CommandBuilder {
    program: String,
    helper: String,
    workdir: PathBuf,
}

impl CommandBuilder {
    /// `program` is the ring-builder executable, `helper` the interpreter
    /// used for the device-table bridge.
    pub fn new(workdir: impl Into<PathBuf>, program: impl Into<String>, helper: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            helper: helper.into(),
            workdir: workdir.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output, BuilderError> {
        debug!(program = %self.program, ?args, "running ring builder");
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BuilderError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    async fn run_ok(&self, args: Vec<String>) -> Result<(), BuilderError> {
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(command_failed(&self.program, args, &output))
    }
}

#[async_trait::async_trait]
impl RingBuilder for CommandBuilder {
    async fn create(
        &self,
        ring: RingClass,
        part_power: u32,
        replicas: f64,
        min_part_hours: u32,
    ) -> Result<(), BuilderError> {
        self.run_ok(create_args(ring, part_power, replicas, min_part_hours))
            .await
    }

    async fn search(
        &self,
        ring: RingClass,
        host: &str,
        device: &str,
    ) -> Result<bool, BuilderError> {
        let args = search_args(ring, host, device);
        let output = self.run(&args).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => Err(command_failed(&self.program, args, &output)),
        }
    }

    async fn add(&self, ring: RingClass, device: &NewDevice) -> Result<(), BuilderError> {
        self.run_ok(add_args(ring, device)).await
    }

    async fn set_weight(
        &self,
        ring: RingClass,
        host: &str,
        weight: f64,
    ) -> Result<(), BuilderError> {
        self.run_ok(set_weight_args(ring, host, weight)).await
    }

    async fn remove(&self, ring: RingClass, device_id: u32) -> Result<(), BuilderError> {
        self.run_ok(remove_args(ring, device_id)).await
    }

    async fn rebalance(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.run_ok(plain_args(ring, "rebalance")).await
    }

    async fn pretend_min_part_hours_passed(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.run_ok(plain_args(ring, "pretend_min_part_hours_passed"))
            .await
    }

    async fn write_ring(&self, ring: RingClass) -> Result<(), BuilderError> {
        self.run_ok(plain_args(ring, "write_ring")).await
    }

    async fn load_devices(&self, builder_file: &str) -> Result<Vec<BuilderDevice>, BuilderError> {
        let args = vec![
            "-c".to_string(),
            DUMP_SCRIPT.to_string(),
            builder_file.to_string(),
        ];
        let output = Command::new(&self.helper)
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BuilderError::Spawn {
                program: self.helper.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(command_failed(&self.helper, args, &output));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| BuilderError::DeviceDump(e.to_string()))
    }

    async fn save_devices(
        &self,
        builder_file: &str,
        devices: &[BuilderDevice],
    ) -> Result<(), BuilderError> {
        let payload =
            serde_json::to_vec(devices).map_err(|e| BuilderError::DeviceDump(e.to_string()))?;
        let args = vec![
            "-c".to_string(),
            APPLY_SCRIPT.to_string(),
            builder_file.to_string(),
        ];

        let mut child = Command::new(&self.helper)
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BuilderError::Spawn {
                program: self.helper.clone(),
                source,
            })?;

        // Write the device list, then close stdin to signal EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(command_failed(&self.helper, args, &output));
        }
        Ok(())
    }
}

fn command_failed(program: &str, args: Vec<String>, output: &std::process::Output) -> BuilderError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut parts = Vec::new();
    if !stderr.trim().is_empty() {
        parts.push(stderr.trim().to_string());
    }
    if !stdout.trim().is_empty() {
        parts.push(stdout.trim().to_string());
    }
    BuilderError::CommandFailed {
        program: program.to_string(),
        args,
        status: output.status.code().unwrap_or(-1),
        output: parts.join("\n"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
