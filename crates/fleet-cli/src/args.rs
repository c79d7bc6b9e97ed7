use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use fleet_planner::emit::{DEFAULT_KUBE_VERSION, DEFAULT_LARGE_CLUSTER_THRESHOLD};
use fleet_probe::{CommandTimeouts, DiscoveryConfig, DEFAULT_MAX_CONCURRENCY};

#[derive(Debug, Parser)]
#[command(name = "fleet")]
#[command(about = "Hardware discovery and deployment planning for GPU clusters", long_about = None)]
pub struct Args {
    /// OTLP/HTTP endpoint for span export (e.g. http://127.0.0.1:4318)
    #[arg(long, global = true, env = "FLEET_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint
    #[arg(long, global = true, env = "FLEET_OTLP_TOKEN")]
    pub otlp_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe every node, plan the cluster and write all artifacts
    Discover(DiscoverArgs),
    /// Render an Ansible inventory from a saved plan
    GenerateInventory {
        /// deployment_plan.json written by `discover`
        plan: PathBuf,
        /// Login written into every host entry
        username: String,
        ssh_key_path: String,
        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Render cluster bootstrap parameters from a saved plan
    GenerateBootstrapConfig {
        plan: PathBuf,
        #[arg(long, default_value = DEFAULT_KUBE_VERSION)]
        kube_version: String,
        /// Node count at which large-cluster settings apply
        #[arg(long, default_value_t = DEFAULT_LARGE_CLUSTER_THRESHOLD)]
        large_cluster_threshold: usize,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Render RAG application sizing from a saved plan
    GenerateAppConfig {
        plan: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Re-render the discovery report from a saved plan
    Report {
        plan: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub struct DiscoverArgs {
    /// JSON array of {"hostname", "ip_address", "username", "port"?}
    pub nodes_file: PathBuf,

    /// Private key used for every host
    pub ssh_key_path: String,

    /// Directory for the plan, report and configs (created if missing)
    pub output_dir: PathBuf,

    /// Hosts probed at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Timeout for cheap commands (nproc, free, uname, which)
    #[arg(long, default_value_t = 5)]
    pub command_timeout_secs: u64,

    /// Timeout for lsblk, nvidia-smi and ip
    #[arg(long, default_value_t = 30)]
    pub heavy_command_timeout_secs: u64,

    /// Login written into the inventory (default: each node's own username)
    #[arg(long)]
    pub inventory_user: Option<String>,

    #[arg(long, default_value = DEFAULT_KUBE_VERSION)]
    pub kube_version: String,

    /// ssh client binary
    #[arg(long, env = "FLEET_SSH_BIN", default_value = "ssh")]
    pub ssh_binary: String,
}

impl DiscoverArgs {
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_concurrency: self.max_concurrency,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeouts: CommandTimeouts {
                quick: Duration::from_secs(self.command_timeout_secs),
                heavy: Duration::from_secs(self.heavy_command_timeout_secs),
            },
        }
    }
}
