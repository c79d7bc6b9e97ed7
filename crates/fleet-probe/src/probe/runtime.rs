use super::{binary_present, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

/// Returns `(docker, containerd)` presence.
pub async fn probe_container_runtime(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<(bool, bool), ProbeError> {
    let docker = binary_present(shell, "docker", timeouts.quick).await?;
    let containerd = binary_present(shell, "containerd", timeouts.quick).await?;
    Ok((docker, containerd))
}

pub async fn probe_orchestrator(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<bool, ProbeError> {
    binary_present(shell, "kubectl", timeouts.quick).await
}
