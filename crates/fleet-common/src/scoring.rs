use serde::{Deserialize, Serialize};

use crate::{NodeCapabilities, NodeRole};

/// One step of a tier table: values at or above `min` earn `points`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub min: f64,
    pub points: u32,
}

/// Stepped lookup for a single scoring axis. Tiers are kept sorted by
/// descending `min`, so the first matching tier is the highest one reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by(|a, b| b.min.total_cmp(&a.min));
        Self { tiers }
    }

    fn from_pairs(pairs: &[(f64, u32)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(min, points)| Tier { min, points })
                .collect(),
        )
    }

    pub fn points(&self, value: f64) -> u32 {
        self.tiers
            .iter()
            .find(|t| value >= t.min)
            .map(|t| t.points)
            .unwrap_or(0)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

/// Additive fitness heuristic used to rank nodes for role assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringPolicy {
    pub cpu_cores: TierTable,
    pub memory_gb: TierTable,
    pub fast_storage_gb: TierTable,
    pub network_gbps: TierTable,
    /// Flat bonus for carrying at least one GPU.
    pub gpu_present: u32,
    /// Extra points by total GPU memory, only applied when a GPU is present.
    pub gpu_memory_gb: TierTable,
    /// Minimum score for a GPU-less node to be control-plane eligible.
    pub control_plane_min_score: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            cpu_cores: TierTable::from_pairs(&[(16.0, 10), (8.0, 5), (4.0, 2)]),
            memory_gb: TierTable::from_pairs(&[(64.0, 10), (32.0, 5), (16.0, 2)]),
            fast_storage_gb: TierTable::from_pairs(&[(500.0, 10), (100.0, 5), (50.0, 2)]),
            network_gbps: TierTable::from_pairs(&[(25.0, 10), (10.0, 5), (1.0, 2)]),
            gpu_present: 20,
            gpu_memory_gb: TierTable::from_pairs(&[
                (80.0, 15),
                (48.0, 12),
                (40.0, 10),
                (24.0, 8),
                (16.0, 5),
                (8.0, 3),
            ]),
            control_plane_min_score: 15,
        }
    }
}

impl ScoringPolicy {
    pub fn score(&self, node: &NodeCapabilities) -> u32 {
        let mut score = self.cpu_cores.points(node.cpu.cores as f64)
            + self.memory_gb.points(node.memory.total_gb)
            + self.fast_storage_gb.points(node.storage.fast_gb)
            + self.network_gbps.points(node.network.speed_gbps);

        if node.has_gpu() {
            score += self.gpu_present + self.gpu_memory_gb.points(node.gpu.total_memory_gb);
        }
        score
    }

    /// GPU presence wins over any score-based classification.
    pub fn role_for(&self, node: &NodeCapabilities, score: u32) -> NodeRole {
        if node.has_gpu() {
            NodeRole::GpuWorker
        } else if score >= self.control_plane_min_score {
            NodeRole::ControlPlane
        } else {
            NodeRole::Worker
        }
    }

    /// Scores `node` and writes the result into its derived fields.
    pub fn apply(&self, node: &mut NodeCapabilities) {
        let score = self.score(node);
        node.recommended_role = self.role_for(node, score);
        node.priority_score = score;
    }
}
