use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fleet_common::{DeploymentPlan, NodeDescriptor};
use fleet_planner::{
    render_app_config, render_bootstrap_config, render_inventory, render_report,
    BootstrapOptions, InventoryOptions,
};

pub const PLAN_FILE: &str = "deployment_plan.json";
pub const REPORT_FILE: &str = "discovery_report.md";
pub const INVENTORY_FILE: &str = "inventory.yml";
pub const BOOTSTRAP_FILE: &str = "bootstrap_config.yml";
pub const APP_CONFIG_FILE: &str = "app_config.yml";

pub fn load_nodes(path: &Path) -> Result<Vec<NodeDescriptor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read node list {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid node list {}", path.display()))
}

pub fn load_plan(path: &Path) -> Result<DeploymentPlan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid plan {}", path.display()))
}

/// Prints to stdout, or writes `text` to `output` when given.
pub fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// Writes the plan and every derived artifact into `dir`. Everything is
/// rendered before the first file is written.
pub fn write_artifacts(
    dir: &Path,
    plan: &DeploymentPlan,
    inventory: &InventoryOptions,
    bootstrap: &BootstrapOptions,
) -> Result<Vec<PathBuf>> {
    let files = [
        (
            PLAN_FILE,
            serde_json::to_string_pretty(plan).context("failed to serialize plan")?,
        ),
        (REPORT_FILE, render_report(plan)?),
        (INVENTORY_FILE, render_inventory(plan, inventory)?),
        (BOOTSTRAP_FILE, render_bootstrap_config(plan, bootstrap)?),
        (APP_CONFIG_FILE, render_app_config(plan)?),
    ];

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
