use clap::{Parser, Subcommand};
use macocr_bridge::{
    server, Config, EngineConfig, RecognitionMode, RecognitionRequest, Recognizer,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "macocr-bridge")]
#[command(about = "Structured OCR results from the macOS Vision text recognition engine")]
#[command(version)]
pub struct Args {
    /// Path to the macocr engine executable
    #[arg(long, env = "MACOCR_ENGINE_PATH", global = true)]
    pub engine_path: Option<PathBuf>,

    /// Seconds a single recognition may run before the engine is killed
    #[arg(long, env = "MACOCR_TIMEOUT_SECS", default_value = "30", global = true)]
    pub timeout_secs: u64,

    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Recognize one image and print its regions as JSON
    Recognize(RecognizeArgs),
}

#[derive(clap::Args, Debug)]
pub struct RecognizeArgs {
    /// Use fast recognition instead of accurate
    #[arg(long)]
    pub fast: bool,

    /// Enable language correction
    #[arg(long)]
    pub fix: bool,

    /// Minimum text height relative to the image height (0-1)
    #[arg(long)]
    pub min_text_height: Option<f32>,

    /// File with one custom word per line
    #[arg(long)]
    pub custom_word_file: Option<PathBuf>,

    /// Image to recognize
    pub image: PathBuf,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            max_file_size: args.max_file_size,
            engine: EngineConfig {
                engine_path: args.engine_path.clone(),
                timeout: Duration::from_secs(args.timeout_secs),
            },
        }
    }
}

impl From<RecognizeArgs> for RecognitionRequest {
    fn from(args: RecognizeArgs) -> Self {
        let mode = if args.fast {
            RecognitionMode::Fast
        } else {
            RecognitionMode::Accurate
        };
        let mut request = RecognitionRequest::new(args.image)
            .mode(mode)
            .correction(args.fix);
        if let Some(height) = args.min_text_height {
            request = request.min_text_height(height);
        }
        if let Some(path) = args.custom_word_file {
            request = request.custom_word_file(path);
        }
        request
    }
}

async fn recognize_once(config: Config, args: RecognizeArgs) -> anyhow::Result<()> {
    let recognizer = Recognizer::new(config.engine);
    let request = RecognitionRequest::from(args);

    let regions = recognizer.recognize(&request).await.into_result()?;
    println!("{}", serde_json::to_string_pretty(&regions)?);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for recognition output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(&args);

    match args.command {
        Some(Command::Recognize(recognize_args)) => recognize_once(config, recognize_args).await,
        Some(Command::Serve) | None => {
            tracing::info!("Starting macocr-bridge v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);

            server::run(config).await
        }
    }
}
