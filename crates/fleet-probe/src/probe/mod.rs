//! Capability probes. Each one turns command output into one typed facet.
//!
//! Probes run sequentially over a single session. A failing probe logs a
//! warning, records it on the node and leaves its facet at the default; it
//! never stops the probes after it.

pub mod cpu;
pub mod gpu;
pub mod memory;
pub mod network;
pub mod os;
pub mod runtime;
pub mod storage;

use std::time::Duration;

use fleet_common::NodeCapabilities;

use crate::config::CommandTimeouts;
use crate::session::{RemoteShell, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("`{command}` exited with {status:?}: {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("unparsable {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

impl ProbeError {
    pub(crate) fn parse(what: &'static str, detail: impl std::fmt::Display) -> Self {
        ProbeError::Parse {
            what,
            detail: detail.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Cpu,
    Memory,
    Storage,
    Gpu,
    Network,
    Os,
    ContainerRuntime,
    Orchestrator,
}

impl Probe {
    pub const ALL: [Probe; 8] = [
        Probe::Cpu,
        Probe::Memory,
        Probe::Storage,
        Probe::Gpu,
        Probe::Network,
        Probe::Os,
        Probe::ContainerRuntime,
        Probe::Orchestrator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Probe::Cpu => "cpu",
            Probe::Memory => "memory",
            Probe::Storage => "storage",
            Probe::Gpu => "gpu",
            Probe::Network => "network",
            Probe::Os => "os",
            Probe::ContainerRuntime => "container_runtime",
            Probe::Orchestrator => "orchestrator",
        }
    }
}

/// Runs `command` and returns stdout, treating a non-zero exit as failure.
pub(crate) async fn run_checked(
    shell: &mut dyn RemoteShell,
    command: &str,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let out = shell.run(command, timeout).await?;
    if !out.success() {
        return Err(ProbeError::CommandFailed {
            command: command.to_string(),
            status: out.exit_status,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out.stdout)
}

/// A located binary path means the tool is present.
pub(crate) async fn binary_present(
    shell: &mut dyn RemoteShell,
    binary: &str,
    timeout: Duration,
) -> Result<bool, ProbeError> {
    let out = shell.run(&format!("which {binary}"), timeout).await?;
    Ok(out.success() && !out.stdout.trim().is_empty())
}

/// Runs every probe in order against one host.
pub async fn run_all(
    shell: &mut dyn RemoteShell,
    node: &mut NodeCapabilities,
    timeouts: &CommandTimeouts,
) {
    for probe in Probe::ALL {
        if let Err(e) = run_one(probe, shell, node, timeouts).await {
            tracing::warn!(
                host = %node.hostname,
                probe = probe.name(),
                error = %e,
                "probe failed, keeping defaults"
            );
            node.warn(probe.name(), e.to_string());
        }
    }
}

async fn run_one(
    probe: Probe,
    shell: &mut dyn RemoteShell,
    node: &mut NodeCapabilities,
    timeouts: &CommandTimeouts,
) -> Result<(), ProbeError> {
    match probe {
        Probe::Cpu => node.cpu = cpu::probe(shell, timeouts).await?,
        Probe::Memory => node.memory = memory::probe(shell, timeouts).await?,
        Probe::Storage => node.storage = storage::probe(shell, timeouts).await?,
        Probe::Gpu => node.gpu = gpu::probe(shell, timeouts).await?,
        Probe::Network => node.network = network::probe(shell, timeouts).await?,
        Probe::Os => node.os = os::probe(shell, timeouts).await?,
        Probe::ContainerRuntime => {
            let (docker, containerd) = runtime::probe_container_runtime(shell, timeouts).await?;
            node.runtime.docker = docker;
            node.runtime.containerd = containerd;
        }
        Probe::Orchestrator => {
            node.runtime.kubectl = runtime::probe_orchestrator(shell, timeouts).await?;
        }
    }
    Ok(())
}
