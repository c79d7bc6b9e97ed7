use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NodeCapabilities;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Ok,
}

/// Advisory text derived from aggregate totals. Nothing enforces these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

impl Recommendation {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Ok,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "[warning] {}", self.message),
            Severity::Ok => write!(f, "[ok] {}", self.message),
        }
    }
}

/// Totals across every planned node, independent of role partitioning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub total_nodes: usize,
    pub control_plane_nodes: usize,
    pub gpu_worker_nodes: usize,
    pub worker_nodes: usize,
    pub total_gpus: u32,
    pub total_gpu_memory_gb: f64,
    pub total_cpu_cores: u32,
    pub total_memory_gb: f64,
    pub total_storage_gb: f64,
    pub total_fast_storage_gb: f64,
}

/// Partitioned node set plus totals. Rebuilt from scratch on every planning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    pub control_plane: NodeCapabilities,

    /// True when no node was control-plane eligible on its own and the
    /// highest-scoring node was promoted instead.
    #[serde(default)]
    pub control_plane_fallback: bool,

    pub gpu_workers: Vec<NodeCapabilities>,
    pub workers: Vec<NodeCapabilities>,
    pub summary: PlanSummary,
    pub recommendations: Vec<Recommendation>,
}

impl DeploymentPlan {
    /// Every planned node: control plane first, then GPU workers, then workers.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeCapabilities> {
        std::iter::once(&self.control_plane)
            .chain(self.gpu_workers.iter())
            .chain(self.workers.iter())
    }

    /// Checks that the summary counts agree with the partitions. Plans loaded
    /// from disk may have been edited by hand.
    pub fn check_consistency(&self) -> Result<(), PlanConsistencyError> {
        let s = &self.summary;
        if s.control_plane_nodes != 1 {
            return Err(PlanConsistencyError::ControlPlaneCount(s.control_plane_nodes));
        }
        if s.gpu_worker_nodes != self.gpu_workers.len() {
            return Err(PlanConsistencyError::Count {
                group: "gpu workers",
                summary: s.gpu_worker_nodes,
                listed: self.gpu_workers.len(),
            });
        }
        if s.worker_nodes != self.workers.len() {
            return Err(PlanConsistencyError::Count {
                group: "workers",
                summary: s.worker_nodes,
                listed: self.workers.len(),
            });
        }
        let listed = 1 + self.gpu_workers.len() + self.workers.len();
        if s.total_nodes != listed {
            return Err(PlanConsistencyError::Count {
                group: "nodes",
                summary: s.total_nodes,
                listed,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanConsistencyError {
    #[error("summary reports {0} control-plane nodes, expected 1")]
    ControlPlaneCount(usize),

    #[error("summary reports {summary} {group} but plan lists {listed}")]
    Count {
        group: &'static str,
        summary: usize,
        listed: usize,
    },

    #[error("host {0} is listed more than once")]
    DuplicateHost(String),
}
