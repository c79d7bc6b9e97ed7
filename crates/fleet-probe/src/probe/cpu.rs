use fleet_common::CpuFacet;

use super::{run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<CpuFacet, ProbeError> {
    let nproc = run_checked(shell, "nproc", timeouts.quick).await?;
    let cores = parse_nproc(&nproc)?;

    let cpuinfo = run_checked(shell, "cat /proc/cpuinfo", timeouts.quick).await?;
    let (model, mhz) = parse_cpuinfo(&cpuinfo);

    Ok(CpuFacet {
        cores,
        model,
        frequency_ghz: mhz / 1000.0,
    })
}

pub fn parse_nproc(text: &str) -> Result<u32, ProbeError> {
    text.trim()
        .parse::<u32>()
        .map_err(|e| ProbeError::parse("nproc output", e))
}

/// Returns the first `model name` and the first `cpu MHz` found. Either may be
/// missing (ARM kernels often omit both).
pub fn parse_cpuinfo(text: &str) -> (String, f64) {
    let mut model = None;
    let mut mhz = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "model name" if model.is_none() => model = Some(value.trim().to_string()),
            "cpu MHz" if mhz.is_none() => mhz = value.trim().parse::<f64>().ok(),
            _ => {}
        }
        if model.is_some() && mhz.is_some() {
            break;
        }
    }

    (model.unwrap_or_default(), mhz.unwrap_or(0.0))
}
