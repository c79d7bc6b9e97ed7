use serde::Serialize;
use serde_yaml::{Mapping, Value};

use fleet_common::{DeploymentPlan, NodeCapabilities, PlanConsistencyError};

use crate::error::RenderError;

const SSH_COMMON_ARGS: &str = "-o StrictHostKeyChecking=no";
const PYTHON_INTERPRETER: &str = "/usr/bin/python3";

/// Credentials written into every host entry.
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Login for every host. `None` keeps each node's own discovery username.
    pub username: Option<String>,
    pub ssh_key_path: String,
}

#[derive(Serialize)]
struct Inventory<'a> {
    all: AllGroup<'a>,
}

#[derive(Serialize)]
struct AllGroup<'a> {
    children: Groups<'a>,
}

#[derive(Serialize)]
struct Groups<'a> {
    kube_control_plane: HostGroup,
    kube_node: HostGroup,
    k8s_cluster: ClusterGroup<'a>,
}

#[derive(Serialize)]
struct HostGroup {
    hosts: Mapping,
}

#[derive(Serialize)]
struct ClusterGroup<'a> {
    children: Mapping,
    vars: ClusterVars<'a>,
}

#[derive(Serialize)]
struct ClusterVars<'a> {
    ansible_python_interpreter: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ansible_user: Option<&'a str>,
    ansible_ssh_private_key_file: &'a str,
    ansible_ssh_common_args: &'static str,
}

#[derive(Serialize)]
struct HostVars<'a> {
    ansible_host: &'a str,
    ansible_user: &'a str,
    ansible_ssh_private_key_file: &'a str,
    ansible_ssh_common_args: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gpu_enabled: Option<bool>,
}

fn add_host(
    hosts: &mut Mapping,
    node: &NodeCapabilities,
    opts: &InventoryOptions,
    gpu_enabled: Option<bool>,
) -> Result<(), RenderError> {
    let vars = HostVars {
        ansible_host: &node.ip_address,
        ansible_user: opts.username.as_deref().unwrap_or(&node.username),
        ansible_ssh_private_key_file: &opts.ssh_key_path,
        ansible_ssh_common_args: SSH_COMMON_ARGS,
        gpu_enabled,
    };
    let previous = hosts.insert(
        Value::String(node.hostname.clone()),
        serde_yaml::to_value(&vars)?,
    );
    if previous.is_some() {
        return Err(PlanConsistencyError::DuplicateHost(node.hostname.clone()).into());
    }
    Ok(())
}

/// Renders an Ansible YAML inventory: the control plane alone in
/// `kube_control_plane`, every other node in `kube_node` (GPU workers first,
/// tagged `gpu_enabled: true`) and both grouped under `k8s_cluster`.
pub fn render_inventory(plan: &DeploymentPlan, opts: &InventoryOptions) -> Result<String, RenderError> {
    plan.check_consistency()?;

    let mut control = Mapping::new();
    add_host(&mut control, &plan.control_plane, opts, None)?;

    let mut nodes = Mapping::new();
    for node in &plan.gpu_workers {
        add_host(&mut nodes, node, opts, Some(true))?;
    }
    for node in &plan.workers {
        add_host(&mut nodes, node, opts, Some(false))?;
    }
    if nodes.contains_key(plan.control_plane.hostname.as_str()) {
        return Err(
            PlanConsistencyError::DuplicateHost(plan.control_plane.hostname.clone()).into(),
        );
    }

    let mut cluster_children = Mapping::new();
    cluster_children.insert("kube_control_plane".into(), Value::Mapping(Mapping::new()));
    cluster_children.insert("kube_node".into(), Value::Mapping(Mapping::new()));

    let inventory = Inventory {
        all: AllGroup {
            children: Groups {
                kube_control_plane: HostGroup { hosts: control },
                kube_node: HostGroup { hosts: nodes },
                k8s_cluster: ClusterGroup {
                    children: cluster_children,
                    vars: ClusterVars {
                        ansible_python_interpreter: PYTHON_INTERPRETER,
                        ansible_user: opts.username.as_deref(),
                        ansible_ssh_private_key_file: &opts.ssh_key_path,
                        ansible_ssh_common_args: SSH_COMMON_ARGS,
                    },
                },
            },
        },
    };
    Ok(serde_yaml::to_string(&inventory)?)
}
