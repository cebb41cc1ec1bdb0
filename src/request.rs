//! Request builder
//!
//! Maps a [`RecognitionRequest`] onto the engine's command line. The engine
//! parses leading flags in order and treats the first non-flag argument as the
//! image, so the image path is always emitted last.

use crate::error::{Failure, FailureKind};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

pub const FAST_FLAG: &str = "--fast";
pub const FIX_FLAG: &str = "--fix";
pub const JSON_FLAG: &str = "--json";
pub const MIN_TEXT_HEIGHT_FLAG: &str = "--min-text-height";
pub const CUSTOM_WORD_FILE_FLAG: &str = "--custom-word-file";
pub const VERSION_FLAG: &str = "--version";

/// Recognition quality/speed tradeoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMode {
    /// Engine default
    #[default]
    Accurate,
    Fast,
}

impl RecognitionMode {
    /// Parse from a form field or CLI value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accurate" => Some(Self::Accurate),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accurate => "accurate",
            Self::Fast => "fast",
        }
    }
}

/// One recognition call's options
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    /// Not checked for existence here; the engine reports unreadable images
    pub image_path: PathBuf,
    pub mode: RecognitionMode,
    pub correction_enabled: bool,
    /// Minimum text height as a fraction of the image height
    pub min_text_height: Option<f32>,
    /// Newline-separated list of words the engine should favour
    pub custom_word_file: Option<PathBuf>,
}

impl RecognitionRequest {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            mode: RecognitionMode::default(),
            correction_enabled: false,
            min_text_height: None,
            custom_word_file: None,
        }
    }

    pub fn mode(mut self, mode: RecognitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn correction(mut self, enabled: bool) -> Self {
        self.correction_enabled = enabled;
        self
    }

    pub fn min_text_height(mut self, height: f32) -> Self {
        self.min_text_height = Some(height);
        self
    }

    pub fn custom_word_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_word_file = Some(path.into());
        self
    }

    fn validate(&self) -> Result<(), Failure> {
        if let Some(height) = self.min_text_height {
            if !height.is_finite() || !(0.0..=1.0).contains(&height) {
                return Err(Failure::new(
                    FailureKind::InvalidRequest,
                    format!("min_text_height must be within [0, 1], got {}", height),
                ));
            }
        }
        Ok(())
    }
}

/// Build the engine argument list for a request.
///
/// Pure: the only failure is a request field out of range.
pub fn build_args(request: &RecognitionRequest) -> Result<Vec<OsString>, Failure> {
    request.validate()?;

    let mut args: Vec<OsString> = Vec::with_capacity(8);

    if request.mode == RecognitionMode::Fast {
        args.push(FAST_FLAG.into());
    }
    if request.correction_enabled {
        args.push(FIX_FLAG.into());
    }
    if let Some(height) = request.min_text_height {
        args.push(MIN_TEXT_HEIGHT_FLAG.into());
        args.push(height.to_string().into());
    }
    if let Some(path) = &request.custom_word_file {
        args.push(CUSTOM_WORD_FILE_FLAG.into());
        args.push(path.clone().into_os_string());
    }

    args.push(JSON_FLAG.into());
    args.push(request.image_path.clone().into_os_string());

    Ok(args)
}
