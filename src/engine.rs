use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// What a finished engine process left behind
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchOutput {
    /// Exit code, `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    /// Raw bytes; the decoder rejects anything that is not UTF-8
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl LaunchOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn exited(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Ways a launch can end without a finished process
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to collect engine output: {0}")]
    Io(#[from] io::Error),

    #[error("engine did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Capability to run the recognition engine once.
///
/// Implementations own the child process for the duration of the call and
/// must not leave it running or unreaped on any path, including when the
/// returned future is dropped.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Run `program` with `args`, waiting at most `timeout`
    async fn launch(
        &self,
        program: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<LaunchOutput, LaunchError>;
}
