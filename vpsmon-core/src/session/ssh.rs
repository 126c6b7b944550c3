//! OpenSSH-backed transport
//!
//! A session is an `ssh -M -N` control master kept alive for the lifetime
//! of the connection. Each command opens its own multiplexed channel over
//! the control socket (`ssh -S <socket> host -- cmd`), so commands run
//! concurrently without re-authenticating. Password authentication goes
//! through `sshpass -e` when a password is configured.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::{AuthMethod, HostConfig};
use crate::error::{ConnectionError, ExecError};

use super::transport::{CommandResult, RemoteChannel, RemoteTransport};

/// Exit status ssh uses for its own (transport) failures
const SSH_TRANSPORT_EXIT: i32 = 255;

/// Exit status sshpass uses for a rejected password
const SSHPASS_BAD_PASSWORD_EXIT: i32 = 5;

/// How often the master is polled while it authenticates
const MASTER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keep-alive messages left unanswered before ssh drops the connection
const SERVER_ALIVE_COUNT_MAX: u32 = 3;

/// Client-side authentication methods disabled on channel commands. Without
/// a control master the client must fail instead of logging in on its own.
const CHANNEL_NO_AUTH_OPTIONS: [&str; 5] = [
    "PubkeyAuthentication=no",
    "PasswordAuthentication=no",
    "KbdInteractiveAuthentication=no",
    "GSSAPIAuthentication=no",
    "HostbasedAuthentication=no",
];

static SOCKET_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens sessions with the system `ssh` client
#[derive(Debug, Clone)]
pub struct SshTransport {
    ssh_program: String,
    socket_dir: PathBuf,
    sshpass: bool,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            socket_dir: std::env::temp_dir(),
            sshpass: sshpass_available(),
        }
    }
}

impl SshTransport {
    /// Creates a transport using `ssh` from `PATH` and the system temp dir.
    ///
    /// Looks up `sshpass` once, here, so `connect` never blocks on it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different ssh binary
    #[must_use]
    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Places control sockets in `dir` (must be short: sun_path is ~104 bytes)
    #[must_use]
    pub fn with_socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    fn next_socket_path(&self) -> PathBuf {
        let n = SOCKET_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.socket_dir
            .join(format!("vpsmon-{}-{n}.sock", std::process::id()))
    }

    fn master_command(
        &self,
        config: &HostConfig,
        control_path: &Path,
    ) -> Result<Command, ConnectionError> {
        let mut cmd = match config.auth_method() {
            AuthMethod::Password => {
                if !self.sshpass {
                    return Err(ConnectionError::Spawn(
                        "sshpass is required for password authentication".to_string(),
                    ));
                }
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg(&self.ssh_program);
                if let Some(ref pw) = config.password {
                    cmd.env("SSHPASS", pw.expose_secret());
                }
                cmd
            }
            AuthMethod::KeyFile | AuthMethod::Agent => {
                let mut cmd = Command::new(&self.ssh_program);
                cmd.arg("-o").arg("BatchMode=yes");
                cmd
            }
        };

        cmd.arg("-M").arg("-N");
        cmd.arg("-o").arg("ControlMaster=yes");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", control_path.display()));
        cmd.arg("-o").arg("ControlPersist=no");
        cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", config.connect_timeout_secs.max(1)));
        cmd.arg("-o")
            .arg(format!("ServerAliveInterval={}", config.keepalive_interval_secs));
        cmd.arg("-o")
            .arg(format!("ServerAliveCountMax={SERVER_ALIVE_COUNT_MAX}"));
        cmd.arg("-p").arg(config.port.to_string());

        if let Some(key) = config.expanded_identity_file() {
            cmd.arg("-i").arg(key);
        }

        cmd.arg(config.destination());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl RemoteTransport for SshTransport {
    async fn connect(
        &self,
        config: &HostConfig,
    ) -> Result<Arc<dyn RemoteChannel>, ConnectionError> {
        config.validate().map_err(ConnectionError::Config)?;

        let control_path = self.next_socket_path();
        let mut master = self
            .master_command(config, &control_path)?
            .spawn()
            .map_err(|e| ConnectionError::Spawn(e.to_string()))?;

        let channel = SshChannel {
            ssh_program: self.ssh_program.clone(),
            destination: config.destination(),
            port: config.port,
            control_path,
            master: Mutex::new(None),
        };

        // Poll until the control socket answers or the master gives up.
        // The caller bounds the whole wait with the connect timeout.
        loop {
            match master.try_wait() {
                Ok(Some(status)) => {
                    let stderr = read_stderr(&mut master).await;
                    return Err(classify_connect_failure(
                        &config.address,
                        status.code(),
                        &stderr,
                        config.auth_method(),
                        config.connect_timeout_secs,
                    ));
                }
                Ok(None) => {}
                Err(e) => return Err(ConnectionError::Spawn(e.to_string())),
            }

            if channel.master_alive().await {
                drain_master_stderr(&mut master);
                *channel.master.lock().await = Some(master);
                return Ok(Arc::new(channel));
            }

            tokio::time::sleep(MASTER_POLL_INTERVAL).await;
        }
    }
}

/// A live control master and the socket its channels go through
#[derive(Debug)]
pub struct SshChannel {
    ssh_program: String,
    destination: String,
    port: u16,
    control_path: PathBuf,
    master: Mutex<Option<Child>>,
}

impl SshChannel {
    fn client_command(&self) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.arg("-S").arg(&self.control_path);
        cmd.arg("-o").arg("ControlMaster=no");
        cmd.arg("-o").arg("BatchMode=yes");
        for option in CHANNEL_NO_AUTH_OPTIONS {
            cmd.arg("-o").arg(option);
        }
        cmd.arg("-p").arg(self.port.to_string());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Asks the control master whether it is still running
    async fn master_alive(&self) -> bool {
        let mut cmd = self.client_command();
        cmd.arg("-O").arg("check").arg(&self.destination);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        matches!(cmd.status().await, Ok(status) if status.success())
    }

    /// True once the master process is gone (or was never attached)
    async fn master_exited(&self) -> bool {
        match self.master.lock().await.as_mut() {
            Some(master) => !matches!(master.try_wait(), Ok(None)),
            None => true,
        }
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn exec(&self, command: &str) -> Result<CommandResult, ExecError> {
        if self.master_exited().await {
            return Err(ExecError::SessionLost(
                "SSH control master is no longer running".to_string(),
            ));
        }

        let mut cmd = self.client_command();
        cmd.arg(&self.destination).arg("--").arg(command);

        let output = cmd
            .output()
            .await
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.code() == Some(SSH_TRANSPORT_EXIT) {
            // 255 is ssh's own failure. Tell a dead session apart from a
            // channel that could not be opened on a healthy one.
            let reason = stderr.trim().to_string();
            return if self.master_alive().await {
                Err(ExecError::Channel(reason))
            } else {
                Err(ExecError::SessionLost(reason))
            };
        }

        Ok(CommandResult {
            exit_status: output.status.code(),
            stdout,
            stderr,
        })
    }

    async fn close(&self) {
        let mut cmd = self.client_command();
        cmd.arg("-O").arg("exit").arg(&self.destination);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let _ = cmd.status().await;

        if let Some(mut master) = self.master.lock().await.take() {
            let _ = master.kill().await;
        }
        let _ = std::fs::remove_file(&self.control_path);
    }
}

impl Drop for SshChannel {
    fn drop(&mut self) {
        // The master child is killed on drop; only the socket file remains.
        let _ = std::fs::remove_file(&self.control_path);
    }
}

/// Forwards the master's stderr to the log so the pipe never fills up
/// while the session is open.
fn drain_master_stderr(master: &mut Child) -> Option<JoinHandle<()>> {
    let stderr = master.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = %line, "ssh control master");
        }
    }))
}

/// Checks whether `sshpass` can be executed
fn sshpass_available() -> bool {
    std::process::Command::new("sshpass")
        .arg("-V")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

async fn read_stderr(child: &mut Child) -> String {
    let mut buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buf).await;
    }
    buf
}

/// Maps a failed master's exit status and stderr to a [`ConnectionError`]
#[must_use]
pub fn classify_connect_failure(
    host: &str,
    exit_code: Option<i32>,
    stderr: &str,
    auth: AuthMethod,
    timeout_secs: u64,
) -> ConnectionError {
    let reason = stderr.trim().to_string();
    let lower = reason.to_lowercase();

    let bad_password = auth == AuthMethod::Password && exit_code == Some(SSHPASS_BAD_PASSWORD_EXIT);
    if bad_password
        || lower.contains("permission denied")
        || lower.contains("authentication failed")
        || lower.contains("too many authentication failures")
    {
        return ConnectionError::AuthRejected {
            host: host.to_string(),
            reason,
        };
    }

    if lower.contains("timed out") {
        return ConnectionError::TimedOut {
            host: host.to_string(),
            secs: timeout_secs,
        };
    }

    ConnectionError::Unreachable {
        host: host.to_string(),
        reason: if reason.is_empty() {
            format!("ssh exited with status {exit_code:?}")
        } else {
            reason
        },
    }
}
