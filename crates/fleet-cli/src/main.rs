mod args;
mod files;
mod output;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fleet_common::telemetry::init_tracing;
use fleet_planner::{
    render_app_config, render_bootstrap_config, render_inventory, render_report,
    BootstrapOptions, InventoryOptions,
};
use fleet_probe::{collect_capabilities, DiscoveryCoordinator, SshConnector};

use crate::args::{Args, Command, DiscoverArgs};
use crate::files::{emit, load_nodes, load_plan, write_artifacts};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let provider = init_tracing(
        "fleet-cli",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let result = run(args.command).await;

    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }
    result
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Discover(args) => discover(args).await,
        Command::GenerateInventory {
            plan,
            username,
            ssh_key_path,
            output,
        } => {
            let plan = load_plan(&plan)?;
            let opts = InventoryOptions {
                username: Some(username),
                ssh_key_path,
            };
            emit(&render_inventory(&plan, &opts)?, output.as_deref())
        }
        Command::GenerateBootstrapConfig {
            plan,
            kube_version,
            large_cluster_threshold,
            output,
        } => {
            let plan = load_plan(&plan)?;
            let opts = BootstrapOptions {
                kube_version,
                large_cluster_threshold,
            };
            emit(&render_bootstrap_config(&plan, &opts)?, output.as_deref())
        }
        Command::GenerateAppConfig { plan, output } => {
            let plan = load_plan(&plan)?;
            emit(&render_app_config(&plan)?, output.as_deref())
        }
        Command::Report { plan, output } => {
            let plan = load_plan(&plan)?;
            emit(&render_report(&plan)?, output.as_deref())
        }
    }
}

async fn discover(args: DiscoverArgs) -> Result<()> {
    let hosts = load_nodes(&args.nodes_file)?;
    info!(hosts = hosts.len(), file = %args.nodes_file.display(), "loaded node list");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling discovery");
            on_interrupt.cancel();
        }
    });

    let coordinator = DiscoveryCoordinator::new(
        Arc::new(SshConnector::with_binary(args.ssh_binary.as_str())),
        args.discovery_config(),
    );
    let outcomes = coordinator
        .discover(&hosts, &args.ssh_key_path, &cancel)
        .await;
    output::print_discovery_failures(&outcomes);

    if cancel.is_cancelled() {
        bail!("discovery interrupted, no artifacts written");
    }

    let nodes = collect_capabilities(outcomes);
    let mut plan = fleet_planner::plan(&nodes)?;
    plan.generated_at = Some(chrono::Utc::now());

    let inventory = InventoryOptions {
        username: args.inventory_user,
        ssh_key_path: args.ssh_key_path,
    };
    let bootstrap = BootstrapOptions {
        kube_version: args.kube_version,
        ..BootstrapOptions::default()
    };
    let written = write_artifacts(&args.output_dir, &plan, &inventory, &bootstrap)?;

    output::print_plan_summary(&plan);
    output::print_written(&written);
    Ok(())
}
