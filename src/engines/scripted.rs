//! Scripted launcher
//!
//! Replays a fixed response instead of spawning the engine, and records every
//! argument list it receives. Lets callers exercise the decoder and their own
//! error handling without the real engine installed.

use crate::engine::{EngineLauncher, LaunchError, LaunchOutput};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// What the fake engine does when launched
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Process ran and exited with this output
    Exit(LaunchOutput),
    /// Process could not be started
    SpawnFails(io::ErrorKind),
    /// Process never finishes; the call times out
    Hang,
}

pub struct ScriptedLauncher {
    response: ScriptedResponse,
    calls: Mutex<Vec<Vec<OsString>>>,
}

impl ScriptedLauncher {
    pub fn new(response: ScriptedResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Exit 0 with `stdout`
    pub fn emitting(stdout: impl Into<Vec<u8>>) -> Self {
        Self::new(ScriptedResponse::Exit(LaunchOutput::success(stdout)))
    }

    /// Exit `code` with `stderr`
    pub fn failing(code: i32, stderr: impl Into<String>) -> Self {
        Self::new(ScriptedResponse::Exit(LaunchOutput::exited(
            code,
            Vec::new(),
            stderr,
        )))
    }

    /// Argument lists seen so far, in call order
    pub fn calls(&self) -> Vec<Vec<OsString>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EngineLauncher for ScriptedLauncher {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn launch(
        &self,
        program: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<LaunchOutput, LaunchError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(args.to_vec());

        match &self.response {
            ScriptedResponse::Exit(output) => Ok(output.clone()),
            ScriptedResponse::SpawnFails(kind) => Err(LaunchError::Spawn {
                program: program.display().to_string(),
                source: io::Error::from(*kind),
            }),
            ScriptedResponse::Hang => {
                tokio::time::sleep(timeout).await;
                Err(LaunchError::TimedOut(timeout))
            }
        }
    }
}
