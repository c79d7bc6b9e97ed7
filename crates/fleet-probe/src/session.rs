use std::time::Duration;

use async_trait::async_trait;

use fleet_common::NodeDescriptor;

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the command was terminated by a signal.
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to launch ssh: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("connection to {host} timed out after {secs}s")]
    ConnectTimeout { host: String, secs: u64 },

    #[error("connection to {host} failed: {message}")]
    Connect { host: String, message: String },

    #[error("command `{command}` timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    #[error("session to {host} is closed")]
    Closed { host: String },

    #[error("session i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where and how to open a session.
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub host: NodeDescriptor,
    pub ssh_key_path: String,
    pub connect_timeout: Duration,
}

/// One authenticated remote shell. Owned by exactly one probe sequence and
/// never shared between tasks.
#[async_trait]
pub trait RemoteShell: Send {
    async fn run(&mut self, command: &str, timeout: Duration)
        -> Result<CommandOutput, SessionError>;

    /// Tears the connection down. Calling `run` afterwards fails with
    /// `SessionError::Closed`.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions; shared by every discovery task.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, target: &SessionTarget) -> Result<Box<dyn RemoteShell>, SessionError>;
}
