use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use speech_emotion::config::Config;
use speech_emotion::logging::init_logging;
use speech_emotion::server::{ErrorResponse, PredictResponse};
use speech_emotion::{EmotionPipeline, FeatureExtractor, MfccConfig};

/// Speech emotion recognition from audio files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.speech-emotion/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSON logs to a daily rotated file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP prediction server
    Serve {
        /// Model artifact (.onnx or .json)
        #[arg(short, long)]
        model: Option<PathBuf>,

        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Load the model before accepting requests
        #[arg(long)]
        eager: bool,
    },

    /// Predict the emotion of one audio file and print JSON
    Predict {
        file: PathBuf,

        /// Model artifact (.onnx or .json)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Include the class index and raw scores
        #[arg(long)]
        scores: bool,
    },

    /// Print the 40 averaged MFCCs of an audio file as JSON
    Features { file: PathBuf },

    /// Write the effective configuration to the config file
    InitConfig {
        /// Model artifact to record in the file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.log_dir.as_deref())?;

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => match Config::default_config_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{:#}; using built-in defaults", e);
                None
            }
        },
    };
    let mut config = Config::load_or_default(config_path.as_deref())?;
    debug!("Config: {:?}", config);

    match args.command {
        Command::Serve {
            model,
            host,
            port,
            eager,
        } => {
            if let Some(model) = model {
                config.model_path = Some(model);
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.eager_load |= eager;

            let model_path = config.get_model_path()?;
            info!("Model: {:?}", model_path);
            let pipeline = Arc::new(EmotionPipeline::from_config(&config, model_path));
            speech_emotion::server::start_server(&config, pipeline).await
        }

        Command::Predict {
            file,
            model,
            scores,
        } => {
            if let Some(model) = model {
                config.model_path = Some(model);
            }
            let audio = read_audio(&file)?;
            let pipeline = EmotionPipeline::from_config(&config, config.get_model_path()?);

            match pipeline.predict_detailed(&audio) {
                Ok(prediction) => {
                    print_json(&PredictResponse::from_prediction(prediction, scores))
                }
                Err(e) => {
                    print_json(&ErrorResponse {
                        error: e.to_string(),
                    })?;
                    std::process::exit(1);
                }
            }
        }

        Command::Features { file } => {
            let audio = read_audio(&file)?;
            let extractor = FeatureExtractor::new(MfccConfig::default())
                .with_expected_sample_rate(config.expected_sample_rate);

            match extractor.extract(&audio) {
                Ok(features) => print_json(&features),
                Err(e) => {
                    print_json(&ErrorResponse {
                        error: e.to_string(),
                    })?;
                    std::process::exit(1);
                }
            }
        }

        Command::InitConfig { model, force } => {
            let path = config_path.context("No config path: pass --config or set HOME")?;
            if path.exists() && !force {
                anyhow::bail!("{:?} already exists (use --force to replace it)", path);
            }
            if let Some(model) = model {
                config.model_path = Some(model);
            }
            config.save(&path)?;
            info!("Wrote config to {:?}", path);
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn read_audio(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read audio file {:?}", path))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
