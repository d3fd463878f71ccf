//! `ringsync` — ring artifact synchronization for replicated object storage.
//!
//! Binary entrypoint that drives the ring lifecycle against a shared state
//! record: fetch the published artifacts, reconcile the device list,
//! rebalance, and publish the results back.
//!
//! # Usage
//!
//! ```text
//! ringsync all                      # full cycle: get, init, update, rebalance, push
//! ringsync get                      # download the published artifacts
//! ringsync update -c ring.toml      # reconcile the device list
//! ringsync rebalance                # rebalance and write ring files
//! ringsync forced-rebalance         # same, with the move cooldown lifted
//! ringsync push                     # publish the workspace artifacts
//! ringsync drain 10.0.0.5           # zero a host's weights before decommission
//! ringsync remove 12                # drop a dead device from all rings
//! ringsync metaswap object.builder  # swap lvm addresses in one builder file
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ringsync_builder::{CommandBuilder, JsonBuilder, RingBuilder};
use ringsync_flow::SyncFlow;
use ringsync_store::HttpStateStore;
use tracing::info;

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "ringsync",
    version,
    about = "Synchronize object-storage rings through a shared state record"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the published ring artifacts into the workspace.
    Get,

    /// Create builders for rings that do not have one yet.
    Init,

    /// Add devices from the desired-device list to all rings.
    Update,

    /// Rebalance all rings and regenerate their ring files.
    Rebalance,

    /// Rebalance with the move cooldown lifted.
    ///
    /// Use after large topology changes, when a second rebalance right
    /// away is preferable to waiting out `min_part_hours`.
    ForcedRebalance,

    /// Publish the workspace artifacts to the store.
    Push,

    /// Run the full cycle: get, init, update, rebalance, push.
    All,

    /// Zero the weight of every device on a host, in all rings.
    ///
    /// Data migrates off the host on the next rebalance.
    Drain {
        /// Host address as it appears in the rings.
        host: String,
    },

    /// Remove a device from all rings by its id.
    Remove {
        /// Device id, shared across rings.
        device_id: u32,
    },

    /// Swap logical-volume addresses in a builder file, in place.
    Metaswap {
        /// Builder file name within the workspace.
        file: String,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    let flow = build_flow(&config)?;

    match cli.command {
        Commands::Get => {
            let files = flow.get().await.context("get failed")?;
            println!("Restored {files} files into the workspace");
        }
        Commands::Init => {
            let created = flow.init().await.context("init failed")?;
            println!("Created {created} builders");
        }
        Commands::Update => {
            let added = flow.update().await.context("update failed")?;
            println!("Added {added} devices");
        }
        Commands::Rebalance => {
            flow.rebalance().await.context("rebalance failed")?;
            println!("Rings rebalanced");
        }
        Commands::ForcedRebalance => {
            flow.forced_rebalance().await.context("forced rebalance failed")?;
            println!("Rings rebalanced");
        }
        Commands::Push => {
            flow.push().await.context("push failed")?;
            println!("Artifacts published");
        }
        Commands::All => {
            flow.all().await.context("sync cycle failed")?;
            println!("Sync cycle complete");
        }
        Commands::Drain { host } => {
            flow.drain(&host).await.context("drain failed")?;
            println!("Host {host} drained in all rings");
        }
        Commands::Remove { device_id } => {
            flow.remove(device_id).await.context("remove failed")?;
            println!("Device d{device_id} removed from all rings");
        }
        Commands::Metaswap { file } => {
            let swapped = flow.metaswap(&file).await.context("metaswap failed")?;
            println!("Swapped {swapped} devices in {file}");
        }
    }

    Ok(())
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wire the store client, the ring builder, and the workflow driver from
/// the config.
fn build_flow(config: &CliConfig) -> Result<SyncFlow> {
    let store = HttpStateStore::new(config.store_options())
        .context("failed to initialize the store client")?;

    let builder: Arc<dyn RingBuilder> = match config.builder.backend.as_str() {
        "json" => {
            info!("using the JSON ring builder backend");
            Arc::new(JsonBuilder::new(&config.rings.dir))
        }
        _ => Arc::new(CommandBuilder::new(
            &config.rings.dir,
            &config.builder.program,
            &config.builder.helper,
        )),
    };

    Ok(SyncFlow::new(Arc::new(store), builder, config.sync_options()))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
