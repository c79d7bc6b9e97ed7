//! Renderers over a finished `DeploymentPlan`. Each one is pure: the same
//! plan always renders to the same bytes.

mod app_config;
mod bootstrap;
mod inventory;
mod report;

pub use app_config::{render_app_config, AppConfig};
pub use bootstrap::{
    render_bootstrap_config, BootstrapConfig, BootstrapOptions, DEFAULT_KUBE_VERSION,
    DEFAULT_LARGE_CLUSTER_THRESHOLD,
};
pub use inventory::{render_inventory, InventoryOptions};
pub use report::render_report;

