use serde::Deserialize;

use fleet_common::{StorageDevice, StorageFacet, StorageKind};

use super::{run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub const LSBLK_COMMAND: &str = "lsblk -d -b -J -o NAME,SIZE,TYPE,MOUNTPOINT,ROTA";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<StorageFacet, ProbeError> {
    let out = run_checked(shell, LSBLK_COMMAND, timeouts.heavy).await?;
    parse_lsblk(&out)
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    size: Option<SizeField>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    rota: Option<FlagField>,
}

/// lsblk prints numbers or strings depending on its version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Bytes(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagField {
    Bool(bool),
    Num(u8),
    Text(String),
}

impl FlagField {
    fn is_set(&self) -> bool {
        match self {
            FlagField::Bool(b) => *b,
            FlagField::Num(n) => *n != 0,
            FlagField::Text(s) => s.trim() == "1",
        }
    }
}

/// Parses `lsblk --json`. Only `type == "disk"` rows count; partitions, loop
/// and rom devices are skipped.
pub fn parse_lsblk(text: &str) -> Result<StorageFacet, ProbeError> {
    if text.trim().is_empty() {
        return Ok(StorageFacet::default());
    }
    let parsed: LsblkOutput =
        serde_json::from_str(text).map_err(|e| ProbeError::parse("lsblk json", e))?;

    let devices = parsed
        .blockdevices
        .into_iter()
        .filter(|d| d.kind == "disk")
        .map(|d| {
            // Missing ROTA is treated as spinning media.
            let rotational = d.rota.as_ref().map(FlagField::is_set).unwrap_or(true);
            let size_gb = match &d.size {
                Some(SizeField::Bytes(b)) => *b as f64 / GIB,
                Some(SizeField::Text(s)) => parse_size_gb(s),
                None => 0.0,
            };
            StorageDevice {
                kind: StorageKind::classify(&d.name, rotational),
                name: d.name,
                size_gb,
                mountpoint: d.mountpoint.filter(|m| !m.is_empty()),
                rotational,
            }
        })
        .collect();

    Ok(StorageFacet::from_devices(devices))
}

/// Converts an lsblk size (`"931.5G"`, `"1.8T"`, `"512M"` or raw bytes) to GiB.
/// Anything unreadable counts as zero.
pub fn parse_size_gb(size: &str) -> f64 {
    let s = size.trim().to_uppercase();
    let (number, scale) = if let Some(n) = s.strip_suffix('T') {
        (n, 1024.0)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1.0 / 1024.0)
    } else {
        (s.as_str(), 1.0 / GIB)
    };
    number
        .trim()
        .parse::<f64>()
        .map(|v| v * scale)
        .unwrap_or(0.0)
}
