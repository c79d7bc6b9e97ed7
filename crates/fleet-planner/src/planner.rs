use tracing::{info, warn};

use fleet_common::{
    DeploymentPlan, DiscoveryStatus, NodeCapabilities, NodeRole, PlanSummary, Recommendation,
};

use crate::error::PlanError;

const MIN_GPUS_FOR_PRODUCTION: u32 = 2;
const MIN_TOTAL_MEMORY_GB: f64 = 64.0;
const MIN_TOTAL_STORAGE_GB: f64 = 500.0;
const MIN_FAST_STORAGE_GB: f64 = 100.0;

/// Partitions scored nodes into a control plane, GPU workers and workers.
///
/// Nodes are ranked by `priority_score` (stable, so ties keep input order).
/// The control plane is the best-ranked control-plane-eligible node. When no
/// node is eligible, the best-ranked reachable node is promoted instead, even
/// if it carries GPUs, and is then left out of the GPU-worker set.
///
/// Further eligible nodes are planned as workers. Unreachable nodes stay in
/// the plan with their zero-valued facets.
pub fn plan(nodes: &[NodeCapabilities]) -> Result<DeploymentPlan, PlanError> {
    if nodes.is_empty() {
        return Err(PlanError::NoNodes);
    }
    if nodes
        .iter()
        .all(|n| n.discovery_status == DiscoveryStatus::Unreachable)
    {
        return Err(PlanError::NoReachableNodes {
            attempted: nodes.len(),
        });
    }

    let mut ranked: Vec<&NodeCapabilities> = nodes.iter().collect();
    ranked.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));

    let (cp_idx, fallback) = match ranked
        .iter()
        .position(|n| n.recommended_role == NodeRole::ControlPlane)
    {
        Some(idx) => (idx, false),
        None => {
            let idx = ranked
                .iter()
                .position(|n| n.discovery_status != DiscoveryStatus::Unreachable)
                .unwrap_or(0);
            (idx, true)
        }
    };

    let mut control_plane = ranked[cp_idx].clone();
    if fallback {
        warn!(
            host = %control_plane.hostname,
            original_role = %control_plane.recommended_role,
            "no control-plane eligible node, promoting highest-scoring node"
        );
    }
    control_plane.recommended_role = NodeRole::ControlPlane;

    let mut gpu_workers = Vec::new();
    let mut workers = Vec::new();
    for (idx, node) in ranked.iter().enumerate() {
        if idx == cp_idx {
            continue;
        }
        match node.recommended_role {
            NodeRole::GpuWorker => gpu_workers.push((*node).clone()),
            NodeRole::Worker => workers.push((*node).clone()),
            NodeRole::ControlPlane => {
                let mut demoted = (*node).clone();
                demoted.recommended_role = NodeRole::Worker;
                workers.push(demoted);
            }
        }
    }

    let summary = summarize(nodes, gpu_workers.len(), workers.len());
    let recommendations = recommend(&summary);

    info!(
        control_plane = %control_plane.hostname,
        fallback,
        gpu_workers = gpu_workers.len(),
        workers = workers.len(),
        "deployment plan built"
    );

    Ok(DeploymentPlan {
        generated_at: None,
        control_plane,
        control_plane_fallback: fallback,
        gpu_workers,
        workers,
        summary,
        recommendations,
    })
}

fn summarize(nodes: &[NodeCapabilities], gpu_workers: usize, workers: usize) -> PlanSummary {
    let mut s = PlanSummary {
        total_nodes: nodes.len(),
        control_plane_nodes: 1,
        gpu_worker_nodes: gpu_workers,
        worker_nodes: workers,
        ..PlanSummary::default()
    };
    for n in nodes {
        s.total_gpus += n.gpu.count;
        s.total_gpu_memory_gb += n.gpu.total_memory_gb;
        s.total_cpu_cores += n.cpu.cores;
        s.total_memory_gb += n.memory.total_gb;
        s.total_storage_gb += n.storage.total_gb;
        s.total_fast_storage_gb += n.storage.fast_gb;
    }
    s
}

fn recommend(s: &PlanSummary) -> Vec<Recommendation> {
    let mut out = Vec::with_capacity(4);

    out.push(match s.total_gpus {
        0 => Recommendation::warning(
            "No GPUs detected. RAG performance will be limited to CPU-only operations.",
        ),
        n if n < MIN_GPUS_FOR_PRODUCTION => Recommendation::warning(
            "Limited GPU resources. Consider adding more GPU nodes for production workloads.",
        ),
        _ => Recommendation::ok("Sufficient GPU resources detected for production RAG workloads."),
    });

    out.push(if s.total_memory_gb < MIN_TOTAL_MEMORY_GB {
        Recommendation::warning(
            "Limited memory resources. Consider adding more RAM for optimal performance.",
        )
    } else {
        Recommendation::ok("Sufficient memory resources detected.")
    });

    out.push(if s.total_storage_gb < MIN_TOTAL_STORAGE_GB {
        Recommendation::warning(
            "Limited storage resources. Consider adding more storage for large datasets.",
        )
    } else {
        Recommendation::ok("Sufficient storage resources detected.")
    });

    out.push(if s.total_fast_storage_gb < MIN_FAST_STORAGE_GB {
        Recommendation::warning(
            "Limited fast storage (NVMe/SSD). Consider adding NVMe storage for better performance.",
        )
    } else {
        Recommendation::ok("Sufficient fast storage detected.")
    });

    out
}
