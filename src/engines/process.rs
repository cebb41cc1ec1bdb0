//! Subprocess launcher
//!
//! Runs the engine binary as a child process. The child is held by
//! [`EngineProcess`] for the whole call: it is killed and reaped on timeout or
//! I/O failure, and killed when the call's future is dropped mid-flight.

use crate::engine::{EngineLauncher, LaunchError, LaunchOutput};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Launcher backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EngineLauncher for ProcessLauncher {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn launch(
        &self,
        program: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<LaunchOutput, LaunchError> {
        let mut process = EngineProcess::spawn(program, args)?;
        tracing::debug!(pid = ?process.id(), program = %program.display(), "engine started");

        let collected = tokio::time::timeout(timeout, process.collect()).await;

        match collected {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                process.terminate().await;
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    pid = ?process.id(),
                    "engine exceeded {:?}, killing",
                    timeout
                );
                process.terminate().await;
                Err(LaunchError::TimedOut(timeout))
            }
        }
    }
}

/// Scoped handle to a running engine child
struct EngineProcess {
    child: Child,
    reaped: bool,
}

impl EngineProcess {
    fn spawn(program: &Path, args: &[OsString]) -> Result<Self, LaunchError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        Ok(Self {
            child,
            reaped: false,
        })
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Drain both pipes while waiting for exit
    async fn collect(&mut self) -> Result<LaunchOutput, LaunchError> {
        let stdout = self.child.stdout.take();
        let stderr = self.child.stderr.take();

        let (stdout, stderr, status) =
            tokio::try_join!(read_pipe(stdout), read_pipe(stderr), self.child.wait())?;
        self.reaped = true;

        Ok(LaunchOutput {
            exit_code: status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    /// Kill the child and wait for it so no zombie is left behind
    async fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        // The engine may have exited while a descendant still holds its pipes
        if let Ok(Some(_)) = self.child.try_wait() {
            self.reaped = true;
            return;
        }
        match self.child.kill().await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => tracing::warn!(pid = ?self.id(), "failed to kill engine: {}", e),
        }
        self.reaped = true;
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        // Reached when the call is cancelled; tokio reaps the killed child.
        if !self.reaped {
            let _ = self.child.start_kill();
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
