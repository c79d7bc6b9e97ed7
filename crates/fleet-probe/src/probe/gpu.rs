use fleet_common::{GpuClass, GpuDevice, GpuFacet};

use super::{binary_present, run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub const QUERY_COMMAND: &str =
    "nvidia-smi --query-gpu=name,memory.total,index --format=csv,noheader,nounits";

/// A host without `nvidia-smi` simply has no GPUs; that is not an error.
pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<GpuFacet, ProbeError> {
    if !binary_present(shell, "nvidia-smi", timeouts.quick).await? {
        return Ok(GpuFacet::default());
    }
    let out = run_checked(shell, QUERY_COMMAND, timeouts.heavy).await?;
    Ok(GpuFacet::from_devices(parse_gpu_query(&out)))
}

/// Parses `name, memory.total [MiB], index` rows. Memory that cannot be read
/// (e.g. `[N/A]`) counts as zero but the device is still listed.
pub fn parse_gpu_query(text: &str) -> Vec<GpuDevice> {
    let mut out = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            continue;
        }
        let name = parts[0].to_string();
        let memory_mb = parts[1].parse::<f64>().unwrap_or(0.0);
        let index = parts
            .get(2)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(out.len() as u32);
        out.push(GpuDevice {
            index,
            class: GpuClass::from_name(&name),
            name,
            memory_gb: memory_mb / 1024.0,
        });
    }
    out
}
