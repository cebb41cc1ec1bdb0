use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the engine lives and how long a call may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Supplied by packaging; `None` fails every call with a configuration error
    pub engine_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl EngineConfig {
    pub fn new(engine_path: impl Into<PathBuf>) -> Self {
        Self {
            engine_path: Some(engine_path.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub engine: EngineConfig,
}
