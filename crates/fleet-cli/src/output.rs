use std::path::PathBuf;

use fleet_common::{DeploymentPlan, NodeCapabilities};
use fleet_probe::HostOutcome;

fn print_node_row(role: &str, n: &NodeCapabilities) {
    println!(
        "  {:<14} {:<20} {:<16} {:>5} {:>5} {:>8.1} {:>6}",
        role,
        n.hostname,
        n.ip_address,
        n.priority_score,
        n.cpu.cores,
        n.memory.total_gb,
        n.gpu.count
    );
}

pub fn print_discovery_failures(outcomes: &[HostOutcome]) {
    let failures: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    if failures.is_empty() {
        return;
    }
    eprintln!("\n✗ {} of {} hosts failed discovery:", failures.len(), outcomes.len());
    for f in failures {
        eprintln!("  {:<20} {}", f.partial.hostname, f.error);
    }
}

pub fn print_plan_summary(plan: &DeploymentPlan) {
    println!("\n=== Deployment Plan ===\n");
    println!(
        "  {:<14} {:<20} {:<16} {:>5} {:>5} {:>8} {:>6}",
        "Role", "Host", "IP", "Score", "Cores", "Mem(GB)", "GPUs"
    );
    println!("  {:-<80}", "");

    let cp_label = if plan.control_plane_fallback {
        "control*"
    } else {
        "control"
    };
    print_node_row(cp_label, &plan.control_plane);
    for n in &plan.gpu_workers {
        print_node_row("gpu_worker", n);
    }
    for n in &plan.workers {
        print_node_row("worker", n);
    }
    if plan.control_plane_fallback {
        println!("\n  * no node qualified for control plane; highest-scoring node promoted");
    }

    let s = &plan.summary;
    println!(
        "\n  {} nodes, {} GPUs ({:.1} GB), {} cores, {:.1} GB memory, {:.1} GB storage ({:.1} GB fast)",
        s.total_nodes,
        s.total_gpus,
        s.total_gpu_memory_gb,
        s.total_cpu_cores,
        s.total_memory_gb,
        s.total_storage_gb,
        s.total_fast_storage_gb
    );

    println!("\n[Recommendations]");
    for r in &plan.recommendations {
        println!("  {r}");
    }
    println!();
}

pub fn print_written(paths: &[PathBuf]) {
    for p in paths {
        println!("✓ wrote {}", p.display());
    }
}
