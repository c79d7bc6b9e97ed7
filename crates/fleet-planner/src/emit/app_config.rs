use serde::{Deserialize, Serialize};

use fleet_common::DeploymentPlan;

use crate::error::RenderError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceQuantities {
    pub cpu: String,
    pub memory: String,
    #[serde(rename = "nvidia.com/gpu")]
    pub gpu: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
}

impl Resources {
    fn sized(cpu: (&str, &str), memory: (&str, &str), gpu: bool) -> Self {
        let gpu = if gpu { "1" } else { "0" };
        Self {
            requests: ResourceQuantities {
                cpu: cpu.0.into(),
                memory: memory.0.into(),
                gpu: gpu.into(),
            },
            limits: ResourceQuantities {
                cpu: cpu.1.into(),
                memory: memory.1.into(),
                gpu: gpu.into(),
            },
        }
    }

    fn small(gpu: bool) -> Self {
        Self::sized(("500m", "2000m"), ("2Gi", "8Gi"), gpu)
    }

    fn large(gpu: bool) -> Self {
        Self::sized(("1000m", "4000m"), ("4Gi", "16Gi"), gpu)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagReplicas {
    pub rag_server: usize,
    pub rag_playground: usize,
    pub ingestor_server: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagResources {
    pub rag_server: Resources,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagSystem {
    pub enabled: bool,
    pub namespace: String,
    pub replicas: RagReplicas,
    pub resources: RagResources,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VectorDatabase {
    pub enabled: bool,
    pub namespace: String,
    pub gpu_enabled: bool,
    pub resources: Resources,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceService {
    pub replicas: usize,
    pub resources: Resources,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceServiceSet {
    pub embedding: InferenceService,
    pub reranking: InferenceService,
    pub llm: InferenceService,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceServices {
    pub enabled: bool,
    pub namespace: String,
    pub services: InferenceServiceSet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservabilityComponents {
    pub opentelemetry: bool,
    pub jaeger: bool,
    pub zipkin: bool,
    pub attu: bool,
    pub prometheus: bool,
    pub grafana: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observability {
    pub enabled: bool,
    pub namespace: String,
    pub components: ObservabilityComponents,
}

/// Resource sizing for the RAG application stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub rag_system: RagSystem,
    #[serde(rename = "milvus")]
    pub vector_database: VectorDatabase,
    #[serde(rename = "nemo_services")]
    pub inference: InferenceServices,
    pub observability: Observability,
}

impl AppConfig {
    /// GPU-bound services scale with the GPU-worker count (at least one
    /// replica). GPU requests are only made when the fleet has a GPU.
    pub fn for_plan(plan: &DeploymentPlan) -> Self {
        let gpu = plan.summary.total_gpus > 0;
        let replicas = plan.gpu_workers.len().max(1);

        Self {
            rag_system: RagSystem {
                enabled: true,
                namespace: "rag-system".into(),
                replicas: RagReplicas {
                    rag_server: replicas,
                    rag_playground: 1,
                    ingestor_server: 1,
                },
                resources: RagResources {
                    rag_server: Resources::small(gpu),
                },
            },
            vector_database: VectorDatabase {
                enabled: true,
                namespace: "milvus".into(),
                gpu_enabled: gpu,
                resources: Resources::large(gpu),
            },
            inference: InferenceServices {
                enabled: true,
                namespace: "nemo-system".into(),
                services: InferenceServiceSet {
                    embedding: InferenceService {
                        replicas,
                        resources: Resources::small(gpu),
                    },
                    reranking: InferenceService {
                        replicas,
                        resources: Resources::small(gpu),
                    },
                    llm: InferenceService {
                        replicas,
                        resources: Resources::large(gpu),
                    },
                },
            },
            observability: Observability {
                enabled: true,
                namespace: "observability".into(),
                components: ObservabilityComponents {
                    opentelemetry: true,
                    jaeger: true,
                    zipkin: true,
                    attu: true,
                    prometheus: true,
                    grafana: true,
                },
            },
        }
    }
}

pub fn render_app_config(plan: &DeploymentPlan) -> Result<String, RenderError> {
    plan.check_consistency()?;
    Ok(serde_yaml::to_string(&AppConfig::for_plan(plan))?)
}
