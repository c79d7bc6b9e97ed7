//! Remote sessions over the system OpenSSH client.
//!
//! `open` starts a ControlMaster process that owns the authenticated
//! connection; every `run` is multiplexed over its control socket, so one
//! session maps to exactly one TCP connection. Dropping the session kills the
//! master.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::session::{CommandOutput, Connector, RemoteShell, SessionError, SessionTarget};

const READY_POLL: Duration = Duration::from_millis(100);
const MASTER_EXIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SshConnector {
    ssh_bin: String,
}

impl SshConnector {
    pub fn new() -> Self {
        Self {
            ssh_bin: "ssh".to_string(),
        }
    }

    /// Use a specific ssh binary instead of the one on `PATH`.
    pub fn with_binary(ssh_bin: impl Into<String>) -> Self {
        Self {
            ssh_bin: ssh_bin.into(),
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn destination(target: &SessionTarget) -> String {
    format!("{}@{}", target.host.username, target.host.ip_address)
}

fn master_args(target: &SessionTarget, control_path: &Path) -> Vec<String> {
    let secs = target.connect_timeout.as_secs().max(1);
    vec![
        "-M".to_string(),
        "-N".to_string(),
        "-S".to_string(),
        control_path.display().to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={secs}"),
        "-i".to_string(),
        target.ssh_key_path.clone(),
        "-p".to_string(),
        target.host.port.to_string(),
        destination(target),
    ]
}

/// Options for each multiplexed command. They carry the target's port, key
/// and timeout so a dead socket can never turn into a connection elsewhere.
fn mux_args(target: &SessionTarget, control_path: &Path) -> Vec<String> {
    let secs = target.connect_timeout.as_secs().max(1);
    vec![
        "-S".to_string(),
        control_path.display().to_string(),
        "-o".to_string(),
        "ControlMaster=no".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={secs}"),
        "-i".to_string(),
        target.ssh_key_path.clone(),
        "-p".to_string(),
        target.host.port.to_string(),
    ]
}

fn control_path() -> PathBuf {
    std::env::temp_dir().join(format!("fleet-{}.sock", uuid::Uuid::new_v4().simple()))
}

async fn control_command(ssh_bin: &str, control_path: &Path, op: &str, dest: &str) -> bool {
    Command::new(ssh_bin)
        .arg("-S")
        .arg(control_path)
        .arg("-O")
        .arg(op)
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Waits until the master accepts multiplexed sessions, or reports why it died.
async fn wait_ready(
    ssh_bin: &str,
    master: &mut Child,
    control_path: &Path,
    dest: &str,
    hostname: &str,
) -> Result<(), SessionError> {
    loop {
        if let Some(status) = master.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = master.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let message = match stderr.trim() {
                "" => format!("ssh exited with {status}"),
                msg => msg.to_string(),
            };
            return Err(SessionError::Connect {
                host: hostname.to_string(),
                message,
            });
        }

        if control_command(ssh_bin, control_path, "check", dest).await {
            return Ok(());
        }
        tokio::time::sleep(READY_POLL).await;
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(&self, target: &SessionTarget) -> Result<Box<dyn RemoteShell>, SessionError> {
        let control_path = control_path();
        let dest = destination(target);
        let hostname = target.host.hostname.clone();

        let mut master = Command::new(&self.ssh_bin)
            .args(master_args(target, &control_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::Spawn)?;

        let ready = tokio::time::timeout(
            target.connect_timeout,
            wait_ready(&self.ssh_bin, &mut master, &control_path, &dest, &hostname),
        )
        .await;

        let failure = match ready {
            Ok(Ok(())) => {
                tracing::debug!(host = %hostname, control_path = %control_path.display(), "ssh session open");
                return Ok(Box::new(SshSession {
                    ssh_bin: self.ssh_bin.clone(),
                    mux_args: mux_args(target, &control_path),
                    control_path,
                    destination: dest,
                    hostname,
                    master: Some(master),
                }));
            }
            Ok(Err(e)) => e,
            Err(_) => SessionError::ConnectTimeout {
                host: hostname,
                secs: target.connect_timeout.as_secs(),
            },
        };

        let _ = master.kill().await;
        let _ = tokio::fs::remove_file(&control_path).await;
        Err(failure)
    }
}

pub struct SshSession {
    ssh_bin: String,
    mux_args: Vec<String>,
    control_path: PathBuf,
    destination: String,
    hostname: String,
    master: Option<Child>,
}

#[async_trait]
impl RemoteShell for SshSession {
    async fn run(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, SessionError> {
        let master_alive = match self.master.as_mut() {
            Some(master) => master.try_wait()?.is_none(),
            None => false,
        };
        if !master_alive {
            return Err(SessionError::Closed {
                host: self.hostname.clone(),
            });
        }

        let mut cmd = Command::new(&self.ssh_bin);
        cmd.args(&self.mux_args)
            .arg(&self.destination)
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(res) => res.map_err(SessionError::Spawn)?,
            Err(_) => {
                return Err(SessionError::CommandTimeout {
                    command: command.to_string(),
                    secs: timeout.as_secs(),
                })
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code(),
        })
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(mut master) = self.master.take() else {
            return Ok(());
        };

        control_command(&self.ssh_bin, &self.control_path, "exit", &self.destination).await;
        if tokio::time::timeout(MASTER_EXIT_GRACE, master.wait())
            .await
            .is_err()
        {
            master.kill().await?;
        }
        let _ = tokio::fs::remove_file(&self.control_path).await;
        tracing::debug!(host = %self.hostname, "ssh session closed");
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.master.is_some() {
            let _ = std::fs::remove_file(&self.control_path);
        }
    }
}
