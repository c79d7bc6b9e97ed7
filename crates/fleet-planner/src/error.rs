use fleet_common::PlanConsistencyError;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("cannot plan a deployment over zero nodes")]
    NoNodes,

    #[error("none of the {attempted} nodes could be reached")]
    NoReachableNodes { attempted: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize artifact: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to format report: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("inconsistent deployment plan: {0}")]
    InconsistentPlan(#[from] PlanConsistencyError),
}
