use fleet_common::OsFacet;

use super::{run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<OsFacet, ProbeError> {
    let release = run_checked(shell, "cat /etc/os-release", timeouts.quick).await?;
    let (name, version) = parse_os_release(&release);
    let kernel = run_checked(shell, "uname -r", timeouts.quick).await?;

    Ok(OsFacet {
        name,
        version,
        kernel: kernel.trim().to_string(),
    })
}

pub fn parse_os_release(text: &str) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("NAME=") {
            name = unquote(v);
        } else if let Some(v) = line.strip_prefix("VERSION_ID=") {
            version = unquote(v);
        }
    }
    (name, version)
}

fn unquote(v: &str) -> String {
    v.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}
