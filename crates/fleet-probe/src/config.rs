use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Per-command timeouts. Nothing runs unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimeouts {
    /// Cheap reads: `nproc`, `free`, `uname`, `which`, sysfs files.
    pub quick: Duration,
    /// Commands that may touch hardware: `lsblk`, `nvidia-smi`, `ip`.
    pub heavy: Duration,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            quick: Duration::from_secs(5),
            heavy: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Upper bound on hosts probed at once (default: 10).
    pub max_concurrency: usize,
    pub connect_timeout: Duration,
    pub timeouts: CommandTimeouts,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            connect_timeout: Duration::from_secs(10),
            timeouts: CommandTimeouts::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Number of pool slots for `hosts` hosts: `min(hosts, max_concurrency)`,
    /// never less than one.
    pub fn pool_size(&self, hosts: usize) -> usize {
        hosts.min(self.max_concurrency).max(1)
    }
}
