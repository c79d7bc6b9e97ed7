//! In-memory session doubles for probe and coordinator tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::session::{CommandOutput, Connector, RemoteShell, SessionError, SessionTarget};

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Hang,
}

/// Answers commands from a fixed table. Unknown commands exit 127.
#[derive(Debug, Clone, Default)]
pub struct ScriptedShell {
    replies: HashMap<String, Reply>,
    delay: Duration,
    closed: bool,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_status: Some(0),
            }),
        );
        self
    }

    pub fn fail(mut self, command: &str, status: i32, stderr: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            Reply::Output(CommandOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_status: Some(status),
            }),
        );
        self
    }

    /// The command never answers; `run` reports a timeout.
    pub fn hang(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Reply::Hang);
        self
    }

    /// Sleep before every reply, so sessions overlap in time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn run(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, SessionError> {
        if self.closed {
            return Err(SessionError::Closed {
                host: "scripted".to_string(),
            });
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.replies.get(command) {
            Some(Reply::Output(out)) => Ok(out.clone()),
            Some(Reply::Hang) => Err(SessionError::CommandTimeout {
                command: command.to_string(),
                secs: timeout.as_secs(),
            }),
            None => Ok(CommandOutput {
                stdout: String::new(),
                stderr: format!("{command}: command not found"),
                exit_status: Some(127),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum HostScript {
    Shell(ScriptedShell),
    Refuse(String),
    Hang,
    Panic,
}

/// Hands out `ScriptedShell`s by hostname and tracks how many are open.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, HostScript>,
    open_now: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, hostname: &str, shell: ScriptedShell) -> Self {
        self.hosts
            .insert(hostname.to_string(), HostScript::Shell(shell));
        self
    }

    pub fn refuse(mut self, hostname: &str, message: &str) -> Self {
        self.hosts
            .insert(hostname.to_string(), HostScript::Refuse(message.to_string()));
        self
    }

    /// Connection attempt runs into the connect timeout.
    pub fn hang(mut self, hostname: &str) -> Self {
        self.hosts.insert(hostname.to_string(), HostScript::Hang);
        self
    }

    /// Opening a session panics inside the discovery task.
    pub fn panic_on(mut self, hostname: &str) -> Self {
        self.hosts.insert(hostname.to_string(), HostScript::Panic);
        self
    }

    pub fn peak_sessions(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, target: &SessionTarget) -> Result<Box<dyn RemoteShell>, SessionError> {
        let hostname = target.host.hostname.clone();
        match self.hosts.get(&hostname) {
            Some(HostScript::Shell(shell)) => {
                let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                Ok(Box::new(TrackedShell {
                    inner: shell.clone(),
                    open_now: self.open_now.clone(),
                    closed: self.closed.clone(),
                    released: false,
                }))
            }
            Some(HostScript::Refuse(message)) => Err(SessionError::Connect {
                host: hostname,
                message: message.clone(),
            }),
            Some(HostScript::Hang) => {
                tokio::time::sleep(target.connect_timeout).await;
                Err(SessionError::ConnectTimeout {
                    host: hostname,
                    secs: target.connect_timeout.as_secs(),
                })
            }
            Some(HostScript::Panic) => panic!("scripted panic for {hostname}"),
            None => Err(SessionError::Connect {
                host: hostname,
                message: "no route to host".to_string(),
            }),
        }
    }
}

struct TrackedShell {
    inner: ScriptedShell,
    open_now: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    released: bool,
}

impl TrackedShell {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.open_now.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RemoteShell for TrackedShell {
    async fn run(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, SessionError> {
        self.inner.run(command, timeout).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.release();
        self.inner.close().await
    }
}

impl Drop for TrackedShell {
    fn drop(&mut self) {
        self.release();
    }
}

/// Canned hosts.
pub mod fixtures {
    use super::ScriptedShell;
    use crate::probe::{gpu, network, storage};

    const FREE_TEMPLATE: &str = "               total        used        free      shared  buff/cache   available\n";

    fn base(cores: u32, mem_gb: u32, nvme_bytes: u64) -> ScriptedShell {
        ScriptedShell::new()
            .respond("nproc", &format!("{cores}\n"))
            .respond(
                "cat /proc/cpuinfo",
                "processor\t: 0\nmodel name\t: AMD EPYC 7763 64-Core Processor\ncpu MHz\t\t: 2450.000\n",
            )
            .respond(
                "free -g",
                &format!(
                    "{FREE_TEMPLATE}Mem: {mem_gb} 10 {free} 0 4 {avail}\nSwap: 7 0 7\n",
                    free = mem_gb.saturating_sub(14),
                    avail = mem_gb.saturating_sub(10),
                ),
            )
            .respond(
                storage::LSBLK_COMMAND,
                &format!(
                    r#"{{"blockdevices":[
                        {{"name":"nvme0n1","size":{nvme_bytes},"type":"disk","mountpoint":"/","rota":false}},
                        {{"name":"sda","size":4000787030016,"type":"disk","mountpoint":"/data","rota":true}}
                    ]}}"#
                ),
            )
            .respond(
                network::ADDR_COMMAND,
                r#"[{"ifname":"lo","operstate":"UNKNOWN","addr_info":[{"local":"127.0.0.1"}]},
                    {"ifname":"ens5","operstate":"UP","addr_info":[{"local":"10.0.0.7"}]}]"#,
            )
            .respond(
                "cat /sys/class/net/ens5/speed 2>/dev/null || echo 1000",
                "25000\n",
            )
            .respond(
                "cat /etc/os-release",
                "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\n",
            )
            .respond("uname -r", "5.15.0-105-generic\n")
            .fail("which docker", 1, "")
            .respond("which containerd", "/usr/bin/containerd\n")
            .respond("which kubectl", "/usr/local/bin/kubectl\n")
    }

    /// 64 cores, 503 GB RAM, 1 TB NVMe, 25 Gbps, two 80 GB GPUs.
    pub fn gpu_server() -> ScriptedShell {
        base(64, 503, 1_024_209_543_168)
            .respond("which nvidia-smi", "/usr/bin/nvidia-smi\n")
            .respond(
                gpu::QUERY_COMMAND,
                "NVIDIA A100-SXM4-80GB, 81920, 0\nNVIDIA A100-SXM4-80GB, 81920, 1\n",
            )
    }

    /// No GPU tooling at all.
    pub fn cpu_server(cores: u32, mem_gb: u32) -> ScriptedShell {
        base(cores, mem_gb, 256_060_514_304).fail("which nvidia-smi", 1, "")
    }
}
