use fleet_common::MemoryFacet;

use super::{run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<MemoryFacet, ProbeError> {
    let out = run_checked(shell, "free -g", timeouts.quick).await?;
    parse_free(&out)
}

/// Parses the `Mem:` row of `free -g`. Older procps builds have no
/// `available` column; `free` is used instead.
pub fn parse_free(text: &str) -> Result<MemoryFacet, ProbeError> {
    let row = text
        .lines()
        .find(|l| l.trim_start().starts_with("Mem:"))
        .ok_or_else(|| ProbeError::parse("free output", "no Mem: row"))?;

    let cols: Vec<&str> = row.split_whitespace().collect();
    let field = |idx: usize| -> Result<f64, ProbeError> {
        cols.get(idx)
            .ok_or_else(|| ProbeError::parse("free output", format!("missing column {idx}")))?
            .parse::<f64>()
            .map_err(|e| ProbeError::parse("free output", e))
    };

    let total = field(1)?;
    let available = if cols.len() > 6 { field(6)? } else { field(3)? };
    Ok(MemoryFacet::new(total, available))
}
