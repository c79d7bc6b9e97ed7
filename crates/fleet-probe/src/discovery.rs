use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

use fleet_common::{DiscoveryStatus, NodeCapabilities, NodeDescriptor, ScoringPolicy};

use crate::config::DiscoveryConfig;
use crate::probe;
use crate::session::{Connector, SessionError, SessionTarget};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("could not open session: {0}")]
    Connect(#[source] SessionError),

    #[error("discovery cancelled")]
    Cancelled,

    #[error("discovery task failed: {0}")]
    TaskFailed(String),
}

/// A host whose discovery did not finish, with whatever was populated first.
#[derive(Debug)]
pub struct HostFailure {
    pub error: DiscoveryError,
    pub partial: NodeCapabilities,
}

pub type HostOutcome = Result<NodeCapabilities, HostFailure>;

/// Flattens outcomes for planning. Failed hosts keep their partial facets.
pub fn collect_capabilities(outcomes: Vec<HostOutcome>) -> Vec<NodeCapabilities> {
    outcomes
        .into_iter()
        .map(|o| match o {
            Ok(node) => node,
            Err(failure) => failure.partial,
        })
        .collect()
}

/// Fans hosts out over a bounded pool, one task per host.
pub struct DiscoveryCoordinator {
    connector: Arc<dyn Connector>,
    config: DiscoveryConfig,
    policy: Arc<ScoringPolicy>,
}

impl DiscoveryCoordinator {
    pub fn new(connector: Arc<dyn Connector>, config: DiscoveryConfig) -> Self {
        Self {
            connector,
            config,
            policy: Arc::new(ScoringPolicy::default()),
        }
    }

    pub fn with_scoring(mut self, policy: ScoringPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Probes every host and returns one outcome per input host, in input
    /// order. Per-host failures never escape their task. Cancelling `cancel`
    /// aborts in-flight probes; affected hosts report `Cancelled`.
    pub async fn discover(
        &self,
        hosts: &[NodeDescriptor],
        ssh_key_path: &str,
        cancel: &CancellationToken,
    ) -> Vec<HostOutcome> {
        let pool = self.config.pool_size(hosts.len());
        info!(hosts = hosts.len(), pool, "starting hardware discovery");

        let permits = Arc::new(Semaphore::new(pool));
        let handles: Vec<_> = hosts
            .iter()
            .map(|host| {
                let task = HostTask {
                    connector: self.connector.clone(),
                    host: host.clone(),
                    ssh_key_path: ssh_key_path.to_string(),
                    config: self.config,
                    policy: self.policy.clone(),
                    permits: permits.clone(),
                    cancel: cancel.clone(),
                };
                let span = tracing::info_span!("discover", host = %host.hostname, ip = %host.ip_address);
                tokio::spawn(task.run().instrument(span))
            })
            .collect();

        let joined = join_all(handles).await;

        let outcomes: Vec<HostOutcome> = hosts
            .iter()
            .zip(joined)
            .map(|(host, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(host = %host.hostname, error = %e, "discovery task died");
                    let mut partial = NodeCapabilities::new(host, ssh_key_path);
                    partial.discovery_status = DiscoveryStatus::Unreachable;
                    self.policy.apply(&mut partial);
                    Err(HostFailure {
                        error: DiscoveryError::TaskFailed(e.to_string()),
                        partial,
                    })
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        info!(
            succeeded = outcomes.len() - failed,
            failed,
            "hardware discovery finished"
        );
        outcomes
    }
}

struct HostTask {
    connector: Arc<dyn Connector>,
    host: NodeDescriptor,
    ssh_key_path: String,
    config: DiscoveryConfig,
    policy: Arc<ScoringPolicy>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl HostTask {
    async fn run(self) -> HostOutcome {
        let mut node = NodeCapabilities::new(&self.host, self.ssh_key_path.clone());
        let mut connected = false;

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(DiscoveryError::Cancelled),
            res = self.probe(&mut node, &mut connected) => res,
        };

        node.discovery_status = if !connected {
            DiscoveryStatus::Unreachable
        } else if result.is_err() || !node.warnings.is_empty() {
            DiscoveryStatus::Partial
        } else {
            DiscoveryStatus::Complete
        };
        self.policy.apply(&mut node);

        match result {
            Ok(()) => {
                info!(
                    score = node.priority_score,
                    role = %node.recommended_role,
                    warnings = node.warnings.len(),
                    "discovery complete"
                );
                Ok(node)
            }
            Err(error) => {
                warn!(error = %error, "discovery failed");
                Err(HostFailure {
                    error,
                    partial: node,
                })
            }
        }
    }

    async fn probe(
        &self,
        node: &mut NodeCapabilities,
        connected: &mut bool,
    ) -> Result<(), DiscoveryError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| DiscoveryError::TaskFailed(e.to_string()))?;

        let target = SessionTarget {
            host: self.host.clone(),
            ssh_key_path: self.ssh_key_path.clone(),
            connect_timeout: self.config.connect_timeout,
        };
        let mut session = self
            .connector
            .open(&target)
            .await
            .map_err(DiscoveryError::Connect)?;
        *connected = true;

        probe::run_all(session.as_mut(), node, &self.config.timeouts).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close session");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{fixtures, ScriptedConnector};
    use fleet_common::NodeRole;

    fn hosts(names: &[&str]) -> Vec<NodeDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| NodeDescriptor::new(*n, format!("10.0.0.{}", i + 1), "ubuntu"))
            .collect()
    }

    fn coordinator(connector: ScriptedConnector, config: DiscoveryConfig) -> DiscoveryCoordinator {
        DiscoveryCoordinator::new(Arc::new(connector), config)
    }

    #[tokio::test]
    async fn test_connection_failure_is_isolated() {
        let connector = ScriptedConnector::new()
            .host("gpu-01", fixtures::gpu_server())
            .refuse("bad-01", "Permission denied (publickey)")
            .host("cpu-01", fixtures::cpu_server(32, 64));
        let coord = coordinator(connector, DiscoveryConfig::default());

        let input = hosts(&["gpu-01", "bad-01", "cpu-01"]);
        let out = coord
            .discover(&input, "/keys/id_ed25519", &CancellationToken::new())
            .await;

        assert_eq!(out.len(), 3);
        let gpu = out[0].as_ref().unwrap();
        assert_eq!(gpu.hostname, "gpu-01");
        assert_eq!(gpu.recommended_role, NodeRole::GpuWorker);
        assert_eq!(gpu.discovery_status, DiscoveryStatus::Complete);
        assert_eq!(gpu.ssh_key_path, "/keys/id_ed25519");

        let failure = out[1].as_ref().unwrap_err();
        assert!(matches!(
            failure.error,
            DiscoveryError::Connect(SessionError::Connect { .. })
        ));
        assert_eq!(failure.partial.hostname, "bad-01");
        assert_eq!(failure.partial.priority_score, 0);
        assert_eq!(failure.partial.recommended_role, NodeRole::Worker);
        assert_eq!(failure.partial.cpu.cores, 0);
        assert_eq!(failure.partial.discovery_status, DiscoveryStatus::Unreachable);

        let cpu = out[2].as_ref().unwrap();
        assert_eq!(cpu.recommended_role, NodeRole::ControlPlane);
    }

    #[tokio::test]
    async fn test_every_host_gets_a_result_in_input_order() {
        let names: Vec<String> = (0..12).map(|i| format!("node-{i:02}")).collect();
        let mut connector = ScriptedConnector::new();
        for (i, name) in names.iter().enumerate() {
            connector = if i % 3 == 0 {
                connector.refuse(name, "connection refused")
            } else {
                connector.host(
                    name,
                    fixtures::cpu_server(8, 16).with_delay(Duration::from_millis((12 - i as u64) * 2)),
                )
            };
        }
        let coord = coordinator(connector, DiscoveryConfig::default());

        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let out = coord
            .discover(&hosts(&refs), "/k", &CancellationToken::new())
            .await;

        assert_eq!(out.len(), 12);
        assert_eq!(out.iter().filter(|o| o.is_err()).count(), 4);
        let got: Vec<String> = collect_capabilities(out)
            .into_iter()
            .map(|n| n.hostname)
            .collect();
        assert_eq!(got, names);
    }

    #[tokio::test]
    async fn test_pool_is_bounded() {
        let names: Vec<String> = (0..25).map(|i| format!("n{i}")).collect();
        let mut connector = ScriptedConnector::new();
        for name in &names {
            connector = connector.host(
                name,
                fixtures::cpu_server(4, 8).with_delay(Duration::from_millis(2)),
            );
        }
        let config = DiscoveryConfig {
            max_concurrency: 4,
            ..DiscoveryConfig::default()
        };
        let coord = DiscoveryCoordinator::new(Arc::new(connector.clone()), config);

        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let out = coord
            .discover(&hosts(&refs), "/k", &CancellationToken::new())
            .await;

        assert_eq!(out.len(), 25);
        assert!(out.iter().all(|o| o.is_ok()));
        assert!(connector.peak_sessions() <= 4, "peak {}", connector.peak_sessions());
        assert_eq!(connector.closed_sessions(), 25);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let connector = ScriptedConnector::new().hang("slow-01");
        let config = DiscoveryConfig {
            connect_timeout: Duration::from_millis(20),
            ..DiscoveryConfig::default()
        };
        let out = coordinator(connector, config)
            .discover(&hosts(&["slow-01"]), "/k", &CancellationToken::new())
            .await;

        let failure = out[0].as_ref().unwrap_err();
        assert!(matches!(
            failure.error,
            DiscoveryError::Connect(SessionError::ConnectTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_stops_in_flight_probes() {
        let connector = ScriptedConnector::new()
            .host("a", fixtures::cpu_server(8, 16).with_delay(Duration::from_secs(30)))
            .host("b", fixtures::cpu_server(8, 16).with_delay(Duration::from_secs(30)));
        let coord = DiscoveryCoordinator::new(Arc::new(connector.clone()), DiscoveryConfig::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let out = coord.discover(&hosts(&["a", "b"]), "/k", &cancel).await;
        assert_eq!(out.len(), 2);
        for o in &out {
            let failure = o.as_ref().unwrap_err();
            assert!(matches!(failure.error, DiscoveryError::Cancelled));
            assert_eq!(failure.partial.discovery_status, DiscoveryStatus::Partial);
        }
        assert_eq!(connector.open_sessions(), 0);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_failures_are_logged_with_host_identity() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let connector = ScriptedConnector::new()
            .refuse("bad-01", "Permission denied (publickey)")
            .host(
                "flaky-01",
                fixtures::cpu_server(8, 16).hang(crate::probe::storage::LSBLK_COMMAND),
            );
        let out = coordinator(connector, DiscoveryConfig::default())
            .discover(&hosts(&["bad-01", "flaky-01"]), "/k", &CancellationToken::new())
            .await;
        assert_eq!(out[1].as_ref().unwrap().discovery_status, DiscoveryStatus::Partial);

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let failed = text
            .lines()
            .find(|l| l.contains("discovery failed"))
            .unwrap();
        assert!(failed.contains("host=bad-01"), "{failed}");
        assert!(failed.contains("Permission denied"), "{failed}");

        let probe = text
            .lines()
            .find(|l| l.contains("probe failed"))
            .unwrap();
        assert!(probe.contains("flaky-01"), "{probe}");
        assert!(probe.contains("probe=\"storage\""), "{probe}");
    }

    #[tokio::test]
    async fn test_panicking_task_still_reports() {
        let connector = ScriptedConnector::new()
            .panic_on("boom")
            .host("ok", fixtures::cpu_server(8, 16));
        let out = coordinator(connector, DiscoveryConfig::default())
            .discover(&hosts(&["boom", "ok"]), "/k", &CancellationToken::new())
            .await;

        assert_eq!(out.len(), 2);
        let failure = out[0].as_ref().unwrap_err();
        assert!(matches!(failure.error, DiscoveryError::TaskFailed(_)));
        assert_eq!(failure.partial.hostname, "boom");
        assert_eq!(failure.partial.discovery_status, DiscoveryStatus::Unreachable);
        assert!(out[1].is_ok());
    }
}
