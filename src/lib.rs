//! Structured text recognition through the macOS Vision OCR engine.
//!
//! The engine is an external executable. This crate builds its command line,
//! runs it under a deadline, and decodes its JSON output into
//! [`RecognizedRegion`]s or a classified [`Failure`].
//!
//! ```no_run
//! use macocr_bridge::{EngineConfig, RecognitionMode, RecognitionRequest, Recognizer};
//!
//! # async fn demo() {
//! let recognizer = Recognizer::new(EngineConfig::new("/usr/local/bin/macocr"));
//! let request = RecognitionRequest::new("receipt.png").mode(RecognitionMode::Fast);
//!
//! match recognizer.recognize(&request).await.into_result() {
//!     Ok(regions) => {
//!         for region in regions {
//!             println!("{:.2} {}", region.confidence, region.text);
//!         }
//!     }
//!     Err(failure) => eprintln!("{} ({})", failure.detail, failure.kind.code()),
//! }
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod engine;
pub mod engines;
pub mod error;
pub mod recognizer;
pub mod region;
pub mod request;
pub mod server;

pub use config::{Config, EngineConfig};
pub use engine::{EngineLauncher, LaunchError, LaunchOutput};
pub use error::{Failure, FailureKind, OcrError};
pub use recognizer::{recognize, Recognizer};
pub use region::{BoundingBox, InvocationOutcome, Point, RecognizedRegion};
pub use request::{build_args, RecognitionMode, RecognitionRequest};
