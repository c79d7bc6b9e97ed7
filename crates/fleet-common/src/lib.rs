pub mod node;
pub mod plan;
pub mod scoring;

pub use node::{
    CpuFacet, DiscoveryStatus, GpuClass, GpuDevice, GpuFacet, MemoryFacet, NetworkFacet,
    NetworkInterface, NodeCapabilities, NodeDescriptor, NodeRole, OsFacet, ProbeWarning,
    RuntimeFacet, StorageDevice, StorageFacet, StorageKind,
};
pub use plan::{DeploymentPlan, PlanConsistencyError, PlanSummary, Recommendation, Severity};
pub use scoring::{ScoringPolicy, Tier, TierTable};

pub mod telemetry;
