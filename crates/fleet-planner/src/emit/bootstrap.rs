use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleet_common::DeploymentPlan;

use crate::error::RenderError;

pub const DEFAULT_KUBE_VERSION: &str = "v1.28.0";
pub const DEFAULT_LARGE_CLUSTER_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub kube_version: String,
    /// Clusters with at least this many nodes get a wider per-node pod CIDR.
    pub large_cluster_threshold: usize,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            kube_version: DEFAULT_KUBE_VERSION.to_string(),
            large_cluster_threshold: DEFAULT_LARGE_CLUSTER_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerdSettings {
    pub version: String,
    pub systemd_cgroup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalicoSettings {
    pub version: String,
    pub ipip_mode: String,
    pub vxlan_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalVolumeSettings {
    pub enabled: bool,
    pub storage_class: String,
}

/// Cluster bootstrap parameters in kubespray group-vars shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub kube_version: String,
    pub container_manager: String,
    pub network_plugin: String,
    pub dns_mode: String,
    pub helm_enabled: bool,
    pub metrics_server_enabled: bool,
    pub local_path_provisioner_enabled: bool,
    pub prometheus_enabled: bool,
    pub grafana_enabled: bool,
    pub nvidia_gpu_enabled: bool,
    pub nvidia_driver_enabled: bool,
    pub podsecuritypolicy_enabled: bool,
    pub rbac_enabled: bool,
    pub containerd: ContainerdSettings,
    pub calico: CalicoSettings,
    pub local_volume_provisioner: LocalVolumeSettings,
    pub etcd_deployment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_controller_manager_extra_args: Option<BTreeMap<String, String>>,
}

impl BootstrapConfig {
    pub fn for_plan(plan: &DeploymentPlan, opts: &BootstrapOptions) -> Self {
        let gpus = plan.summary.total_gpus > 0;
        let large = plan.summary.total_nodes >= opts.large_cluster_threshold;

        Self {
            kube_version: opts.kube_version.clone(),
            container_manager: "containerd".into(),
            network_plugin: "calico".into(),
            dns_mode: "coredns".into(),
            helm_enabled: true,
            metrics_server_enabled: true,
            local_path_provisioner_enabled: true,
            prometheus_enabled: true,
            grafana_enabled: true,
            nvidia_gpu_enabled: gpus,
            nvidia_driver_enabled: gpus,
            podsecuritypolicy_enabled: false,
            rbac_enabled: true,
            containerd: ContainerdSettings {
                version: "1.6.21".into(),
                systemd_cgroup: true,
            },
            calico: CalicoSettings {
                version: "v3.26.0".into(),
                ipip_mode: "Always".into(),
                vxlan_mode: "Never".into(),
            },
            local_volume_provisioner: LocalVolumeSettings {
                enabled: true,
                storage_class: "local-path".into(),
            },
            etcd_deployment_type: "host".into(),
            kube_controller_manager_extra_args: large.then(|| {
                BTreeMap::from([("node-cidr-mask-size".to_string(), "24".to_string())])
            }),
        }
    }
}

pub fn render_bootstrap_config(
    plan: &DeploymentPlan,
    opts: &BootstrapOptions,
) -> Result<String, RenderError> {
    plan.check_consistency()?;
    Ok(serde_yaml::to_string(&BootstrapConfig::for_plan(plan, opts))?)
}
