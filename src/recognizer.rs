//! Caller-facing recognition
//!
//! A [`Recognizer`] pairs an [`EngineConfig`] with a launcher. Every call is
//! independent: build the arguments, launch once, decode. Nothing is cached
//! between calls, so one recognizer can serve concurrent callers.

use crate::config::EngineConfig;
use crate::decoder;
use crate::engine::EngineLauncher;
use crate::engines::ProcessLauncher;
use crate::error::{Failure, FailureKind};
use crate::region::InvocationOutcome;
use crate::request::{build_args, RecognitionMode, RecognitionRequest, VERSION_FLAG};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct Recognizer {
    config: EngineConfig,
    launcher: Arc<dyn EngineLauncher>,
}

impl Recognizer {
    /// Recognizer that spawns the configured engine binary
    pub fn new(config: EngineConfig) -> Self {
        Self::with_launcher(config, Arc::new(ProcessLauncher::new()))
    }

    pub fn with_launcher(config: EngineConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn engine_path(&self) -> Result<&Path, Failure> {
        match self.config.engine_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(Failure::new(
                FailureKind::ConfigurationError,
                "no engine executable configured",
            )),
        }
    }

    /// Run the engine on one image
    pub async fn recognize(&self, request: &RecognitionRequest) -> InvocationOutcome {
        let start = Instant::now();
        let outcome = self.run(request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            InvocationOutcome::Success(regions) => tracing::info!(
                image = %request.image_path.display(),
                mode = request.mode.as_str(),
                "OCR completed in {}ms, {} regions",
                elapsed_ms,
                regions.len()
            ),
            InvocationOutcome::Failure(failure) => tracing::warn!(
                image = %request.image_path.display(),
                code = failure.kind.code(),
                "OCR failed after {}ms: {}",
                elapsed_ms,
                failure.detail
            ),
        }

        outcome
    }

    async fn run(&self, request: &RecognitionRequest) -> InvocationOutcome {
        let program = match self.engine_path() {
            Ok(program) => program,
            Err(failure) => return InvocationOutcome::Failure(failure),
        };
        let args = match build_args(request) {
            Ok(args) => args,
            Err(failure) => return InvocationOutcome::Failure(failure),
        };
        tracing::debug!(launcher = self.launcher.name(), ?args, "launching engine");

        let launched = self
            .launcher
            .launch(program, &args, self.config.timeout)
            .await;

        decoder::decode(launched, || {
            image::image_dimensions(&request.image_path).map_err(|e| e.to_string())
        })
    }

    /// Like [`recognize`](Self::recognize), but gives up when `cancel` completes.
    ///
    /// The in-flight engine is killed before `Cancelled` is returned.
    pub async fn recognize_until<C>(
        &self,
        request: &RecognitionRequest,
        cancel: C,
    ) -> InvocationOutcome
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.recognize(request) => outcome,
            () = cancel => {
                tracing::warn!(image = %request.image_path.display(), "OCR cancelled");
                InvocationOutcome::Failure(Failure::new(
                    FailureKind::Cancelled,
                    "recognition cancelled by caller",
                ))
            }
        }
    }

    /// Ask the engine which recognizer revision it runs
    pub async fn engine_revision(&self) -> Result<String, Failure> {
        let program = self.engine_path()?;
        let launched = self
            .launcher
            .launch(program, &[OsString::from(VERSION_FLAG)], self.config.timeout)
            .await;

        let output = decoder::check_launch(launched)?;
        let revision = decoder::stdout_text(&output.stdout)?.trim();
        if revision.is_empty() {
            return Err(Failure::new(
                FailureKind::OutputParseError,
                "engine printed no revision",
            ));
        }
        Ok(revision.to_string())
    }
}

/// One-shot recognition with the real engine
pub async fn recognize(
    engine_path: Option<PathBuf>,
    image_path: impl Into<PathBuf>,
    mode: RecognitionMode,
    correction_enabled: bool,
    timeout: Duration,
) -> InvocationOutcome {
    let config = EngineConfig {
        engine_path,
        timeout,
    };
    let request = RecognitionRequest::new(image_path)
        .mode(mode)
        .correction(correction_enabled);

    Recognizer::new(config).recognize(&request).await
}
