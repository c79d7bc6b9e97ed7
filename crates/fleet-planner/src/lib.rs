//! Turns discovered capabilities into a deployment plan and renders the
//! artifacts derived from it.

pub mod emit;
pub mod error;
pub mod planner;

#[cfg(test)]
pub(crate) mod testing;

pub use emit::{
    render_app_config, render_bootstrap_config, render_inventory, render_report, AppConfig,
    BootstrapConfig, BootstrapOptions, InventoryOptions,
};
pub use error::{PlanError, RenderError};
pub use planner::plan;
