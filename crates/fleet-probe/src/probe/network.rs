use serde::Deserialize;
use tracing::warn;

use fleet_common::{NetworkFacet, NetworkInterface};

use super::{run_checked, ProbeError};
use crate::config::CommandTimeouts;
use crate::session::RemoteShell;

pub const ADDR_COMMAND: &str = "ip -json addr show";

/// Used when a link speed cannot be read (virtual NICs report -1).
const DEFAULT_SPEED_GBPS: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct IpLink {
    #[serde(default)]
    ifname: String,
    #[serde(default)]
    operstate: Option<String>,
    #[serde(default)]
    addr_info: Vec<IpAddr>,
}

#[derive(Debug, Deserialize)]
struct IpAddr {
    #[serde(default)]
    local: Option<String>,
}

/// Interface name and its bound addresses, loopback excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAddrs {
    pub name: String,
    pub state: String,
    pub addresses: Vec<String>,
}

pub async fn probe(
    shell: &mut dyn RemoteShell,
    timeouts: &CommandTimeouts,
) -> Result<NetworkFacet, ProbeError> {
    let out = run_checked(shell, ADDR_COMMAND, timeouts.heavy).await?;
    let links = parse_ip_addr(&out)?;

    let mut interfaces = Vec::with_capacity(links.len());
    for link in links {
        let speed_gbps = if is_safe_ifname(&link.name) {
            read_speed_gbps(shell, &link.name, timeouts).await
        } else {
            DEFAULT_SPEED_GBPS
        };
        interfaces.push(NetworkInterface {
            name: link.name,
            speed_gbps,
            ip_addresses: link.addresses,
            state: link.state,
        });
    }

    Ok(NetworkFacet::from_interfaces(interfaces))
}

fn speed_command(ifname: &str) -> String {
    format!("cat /sys/class/net/{ifname}/speed 2>/dev/null || echo 1000")
}

/// A failed read only costs this interface its speed, never the whole facet.
async fn read_speed_gbps(
    shell: &mut dyn RemoteShell,
    ifname: &str,
    timeouts: &CommandTimeouts,
) -> f64 {
    match shell.run(&speed_command(ifname), timeouts.quick).await {
        Ok(out) => parse_speed_gbps(&out.stdout),
        Err(e) => {
            warn!(interface = ifname, error = %e, "link speed unreadable, assuming 1 Gbps");
            DEFAULT_SPEED_GBPS
        }
    }
}

pub fn parse_ip_addr(text: &str) -> Result<Vec<LinkAddrs>, ProbeError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let links: Vec<IpLink> =
        serde_json::from_str(text).map_err(|e| ProbeError::parse("ip addr json", e))?;

    Ok(links
        .into_iter()
        .filter(|l| !l.ifname.is_empty() && l.ifname != "lo")
        .map(|l| LinkAddrs {
            addresses: l
                .addr_info
                .into_iter()
                .filter_map(|a| a.local)
                .filter(|a| !a.is_empty())
                .collect(),
            state: l.operstate.unwrap_or_else(|| "UNKNOWN".to_string()),
            name: l.ifname,
        })
        .collect())
}

/// `/sys/class/net/*/speed` is in Mb/s.
pub fn parse_speed_gbps(text: &str) -> f64 {
    match text.trim().parse::<u64>() {
        Ok(mbps) => mbps as f64 / 1000.0,
        Err(_) => DEFAULT_SPEED_GBPS,
    }
}

fn is_safe_ifname(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedShell;

    const IP_JSON: &str = r#"[
        {"ifindex":1,"ifname":"lo","operstate":"UNKNOWN","addr_info":[{"family":"inet","local":"127.0.0.1"}]},
        {"ifindex":2,"ifname":"eno1","operstate":"DOWN","addr_info":[]},
        {"ifindex":3,"ifname":"ens5","operstate":"UP","addr_info":[
            {"family":"inet","local":"10.0.0.7","prefixlen":24},
            {"family":"inet6","local":"fe80::1","prefixlen":64}]},
        {"ifindex":4,"ifname":"docker0","operstate":"DOWN","addr_info":[{"family":"inet","local":"172.17.0.1"}]}
    ]"#;

    #[test]
    fn test_parse_ip_addr_skips_loopback() {
        let links = parse_ip_addr(IP_JSON).unwrap();
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["eno1", "ens5", "docker0"]);
        assert_eq!(links[1].addresses, vec!["10.0.0.7", "fe80::1"]);
        assert_eq!(links[0].state, "DOWN");
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed_gbps("25000\n"), 25.0);
        assert_eq!(parse_speed_gbps("-1"), 1.0);
        assert_eq!(parse_speed_gbps(""), 1.0);
    }

    #[test]
    fn test_ifname_guard() {
        assert!(is_safe_ifname("enp1s0f0.100"));
        assert!(!is_safe_ifname("eth0;reboot"));
    }

    #[tokio::test]
    async fn test_probe_picks_first_addressed_interface() {
        let mut shell = ScriptedShell::new()
            .respond(ADDR_COMMAND, IP_JSON)
            .respond("cat /sys/class/net/eno1/speed 2>/dev/null || echo 1000", "1000\n")
            .respond("cat /sys/class/net/ens5/speed 2>/dev/null || echo 1000", "25000\n")
            .respond("cat /sys/class/net/docker0/speed 2>/dev/null || echo 1000", "-1\n");
        let facet = probe(&mut shell, &CommandTimeouts::default()).await.unwrap();
        assert_eq!(facet.interfaces.len(), 3);
        assert_eq!(facet.primary_interface.as_deref(), Some("ens5"));
        assert_eq!(facet.speed_gbps, 25.0);
        assert_eq!(facet.interfaces[2].speed_gbps, 1.0);
    }

    #[tokio::test]
    async fn test_speed_timeout_keeps_other_interfaces() {
        const TWO_LINKS: &str = r#"[
            {"ifindex":2,"ifname":"ens5","operstate":"UP","addr_info":[{"family":"inet","local":"10.0.0.7"}]},
            {"ifindex":3,"ifname":"ens6","operstate":"UP","addr_info":[{"family":"inet","local":"10.0.1.7"}]}
        ]"#;
        let mut shell = ScriptedShell::new()
            .respond(ADDR_COMMAND, TWO_LINKS)
            .respond(&speed_command("ens5"), "25000\n")
            .hang(&speed_command("ens6"));

        let facet = probe(&mut shell, &CommandTimeouts::default()).await.unwrap();
        assert_eq!(facet.interfaces.len(), 2);
        assert_eq!(facet.primary_interface.as_deref(), Some("ens5"));
        assert_eq!(facet.speed_gbps, 25.0);
        assert_eq!(facet.interfaces[1].name, "ens6");
        assert_eq!(facet.interfaces[1].speed_gbps, DEFAULT_SPEED_GBPS);
        assert_eq!(facet.interfaces[1].ip_addresses, vec!["10.0.1.7"]);
    }
}
