use std::fmt::Write;

use fleet_common::{DeploymentPlan, NodeCapabilities};

use crate::error::RenderError;

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn write_node(out: &mut String, rank: usize, n: &NodeCapabilities) -> std::fmt::Result {
    writeln!(out, "## Node {rank}: {} ({})", n.hostname, n.ip_address)?;
    writeln!(out, "- **Role**: {}", n.recommended_role.as_str().to_uppercase())?;
    writeln!(out, "- **Priority Score**: {}", n.priority_score)?;
    writeln!(out, "- **Discovery**: {}", n.discovery_status)?;
    writeln!(out, "- **OS**: {} {}", n.os.name, n.os.version)?;
    writeln!(out, "- **Kernel**: {}", n.os.kernel)?;
    writeln!(out, "- **CPU**: {} cores, {}", n.cpu.cores, n.cpu.model)?;
    writeln!(
        out,
        "- **Memory**: {:.1} GB total, {:.1} GB available",
        n.memory.total_gb, n.memory.available_gb
    )?;
    writeln!(
        out,
        "- **Storage**: {:.1} GB total, {:.1} GB fast storage",
        n.storage.total_gb, n.storage.fast_gb
    )?;

    if n.has_gpu() {
        writeln!(
            out,
            "- **GPUs**: {} devices, {:.1} GB total",
            n.gpu.count, n.gpu.total_memory_gb
        )?;
        for g in &n.gpu.devices {
            writeln!(out, "  - GPU {}: {} ({:.1} GB)", g.index, g.name, g.memory_gb)?;
        }
    } else {
        writeln!(out, "- **GPUs**: none")?;
    }

    match &n.network.primary_interface {
        Some(iface) => writeln!(
            out,
            "- **Network**: {:.1} Gbps primary interface ({iface})",
            n.network.speed_gbps
        )?,
        None => writeln!(out, "- **Network**: no addressed interface")?,
    }

    writeln!(
        out,
        "- **Container Runtime**: docker={}, containerd={}",
        yes_no(n.runtime.docker),
        yes_no(n.runtime.containerd)
    )?;
    writeln!(out, "- **Kubernetes**: kubectl={}", yes_no(n.runtime.kubectl))?;

    if !n.warnings.is_empty() {
        writeln!(out, "- **Probe Warnings**:")?;
        for w in &n.warnings {
            writeln!(out, "  - {}: {}", w.probe, w.message)?;
        }
    }
    writeln!(out)
}

/// Renders the human-readable discovery report as markdown. Nodes are listed
/// by descending score; ties keep plan order.
pub fn render_report(plan: &DeploymentPlan) -> Result<String, RenderError> {
    plan.check_consistency()?;

    let s = &plan.summary;
    let mut out = String::new();

    writeln!(out, "# Hardware Discovery Report")?;
    if let Some(ts) = plan.generated_at {
        writeln!(out, "Generated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out, "- Total Nodes: {}", s.total_nodes)?;
    write!(out, "- Control Plane: {}", plan.control_plane.hostname)?;
    if plan.control_plane_fallback {
        write!(out, " (fallback: no eligible node)")?;
    }
    writeln!(out)?;
    writeln!(out, "- Control Plane Nodes: {}", s.control_plane_nodes)?;
    writeln!(out, "- GPU Worker Nodes: {}", s.gpu_worker_nodes)?;
    writeln!(out, "- Worker Nodes: {}", s.worker_nodes)?;
    writeln!(out, "- Total GPUs: {}", s.total_gpus)?;
    writeln!(out, "- Total GPU Memory: {:.1} GB", s.total_gpu_memory_gb)?;
    writeln!(out, "- Total CPU Cores: {}", s.total_cpu_cores)?;
    writeln!(out, "- Total Memory: {:.1} GB", s.total_memory_gb)?;
    writeln!(out, "- Total Storage: {:.1} GB", s.total_storage_gb)?;
    writeln!(out, "- Total Fast Storage: {:.1} GB", s.total_fast_storage_gb)?;
    writeln!(out)?;

    let mut ranked: Vec<&NodeCapabilities> = plan.nodes().collect();
    ranked.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    for (i, n) in ranked.iter().enumerate() {
        write_node(&mut out, i + 1, n)?;
    }

    writeln!(out, "## Recommendations")?;
    for r in &plan.recommendations {
        writeln!(out, "- {r}")?;
    }
    Ok(out)
}
