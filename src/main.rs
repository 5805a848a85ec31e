mod butler;
mod config;
mod dora;
mod inventory;
mod pipeline;
mod resource;
mod scenario;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing::{Instrument, info, warn};
use tracing_subscriber::EnvFilter;

use crate::butler::butler_pool::{ButlerPool, LocationPolicy};
use crate::butler::dry_run::DryRunApplier;
use crate::config::settings::Settings;
use crate::pipeline::dispatcher::Dispatcher;
use crate::resource::setup_resource::SetupResource;
use crate::scenario::scenario::{InventoryRequest, Scenario};
use crate::scenario::sources::SourceKind;
use crate::types::asset_type::AssetType;

/// Apply one-time setup configuration to BMCs.
///
/// Some options must be set just once and can power cycle the controller or
/// what sits behind it, e.g. toggling flex addresses on a chassis.
#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, default_value = "bmc-setup.yml")]
    pub config: PathBuf,

    /// Inventory source, overrides inventory.setup.source.
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Comma separated BMC addresses for the iplist source.
    #[arg(long)]
    pub iplist: Option<String>,

    /// Comma separated serials to look up instead of scanning the catalog.
    #[arg(long)]
    pub serial: Option<String>,

    /// Catalog asset type for --serial, e.g. blade, chassis, discrete.
    #[arg(long)]
    pub asset_type: Option<AssetType>,

    /// Configure assets regardless of their location.
    #[arg(long)]
    pub ignore_location: bool,

    /// Number of butlers, overrides butlers_to_spawn.
    #[arg(long)]
    pub butlers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("bmc_setup=info".parse()?),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)?;

    let request = InventoryRequest {
        ip_list: args.iplist.clone(),
        serials: args.serial.clone(),
        asset_type: args.asset_type.clone(),
    };

    let run_span = Scenario::run_span();

    let kind = Scenario::source_kind(args.source, &settings, &request)?;
    let source = Scenario::inventory_source(kind, &settings, &request, &run_span)?;

    let setup = Arc::new(SetupResource::load(&settings.resources.setup)?);
    info!(
        parent: &run_span,
        origin = %setup.origin().display(),
        sections = ?setup.section_names(),
        "loaded setup resources"
    );
    if setup.is_empty() {
        warn!(parent: &run_span, "setup resources declare nothing, butlers will apply no changes");
    }

    let butlers = args.butlers.unwrap_or(settings.butlers_to_spawn).max(1);
    let policy = LocationPolicy::new(
        settings.locations.clone(),
        Scenario::ignore_location(args.ignore_location, &request),
    );

    let dispatcher = Dispatcher::new(settings.queue_capacity, run_span.clone());
    let pool_span = run_span.clone();

    let summary = dispatcher
        .run(vec![source], setup, move |queue| {
            ButlerPool::spawn(butlers, queue, Arc::new(DryRunApplier), policy, pool_span)
        })
        .instrument(run_span.clone())
        .await?;

    info!(
        parent: &run_span,
        batches = summary.batches,
        dispatched = summary.dispatched,
        applied = summary.pool.applied(),
        failed = summary.pool.failed(),
        skipped = summary.pool.skipped(),
        crashed = summary.pool.crashed,
        elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
        "setup run complete"
    );

    Ok(())
}
