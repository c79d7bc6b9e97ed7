//! Remote hardware discovery: SSH sessions, capability probes and the
//! bounded-concurrency coordinator that drives them across a fleet.

pub mod config;
pub mod discovery;
pub mod probe;
pub mod session;
pub mod ssh;

#[cfg(test)]
mod testing;

pub use config::{CommandTimeouts, DiscoveryConfig, DEFAULT_MAX_CONCURRENCY};
pub use discovery::{
    collect_capabilities, DiscoveryCoordinator, DiscoveryError, HostFailure, HostOutcome,
};
pub use probe::{Probe, ProbeError};
pub use session::{CommandOutput, Connector, RemoteShell, SessionError, SessionTarget};
pub use ssh::{SshConnector, SshSession};
