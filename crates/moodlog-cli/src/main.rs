use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use moodlog_ai::{EmbeddingAdapter, HashingEmbedder, InferenceEngine, PrototypeSet};
use moodlog_core::{EngineConfig, Tags};
use moodlog_store::JsonStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod display;

/// Mood journal: tag entries with a mood and an energy level.
#[derive(Parser)]
#[command(name = "moodlog", version, about)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (JSON).
    #[arg(long, env = "MOODLOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Journal file.
    #[arg(long, env = "MOODLOG_DATA", default_value = "data/journal_entries.json", global = true)]
    data: PathBuf,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EmbedderArgs {
    /// Embedding backend.
    #[arg(long = "embedder", env = "MOODLOG_EMBEDDER", value_enum, default_value_t = EmbedderKind::Hashing, global = true)]
    kind: EmbedderKind,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[arg(long, env = "MOODLOG_MODEL_DIR", default_value = "models/all-MiniLM-L6-v2", global = true)]
    model_dir: PathBuf,

    /// Base URL of an OpenAI-compatible embeddings service.
    #[arg(long, env = "MOODLOG_EMBED_URL", default_value = "http://localhost:8080/v1", global = true)]
    endpoint: String,

    /// Model name sent to the embeddings service.
    #[arg(long, env = "MOODLOG_EMBED_MODEL", default_value = "all-minilm", global = true)]
    model: String,

    /// Vector length returned by the embeddings service.
    #[arg(long, env = "MOODLOG_EMBED_DIM", default_value_t = 384, global = true)]
    dim: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Feature hashing; offline, no model needed.
    Hashing,
    /// Local sentence-transformer via ONNX Runtime.
    Onnx,
    /// Remote embeddings service over HTTP.
    Remote,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag and save a new journal entry
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Save the entry as Unknown/Unknown if it cannot be classified.
        #[arg(long)]
        store_unlabeled: bool,
    },
    /// Show the most recent entries
    Summary {
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Tag text without saving it
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Show every label score and the rule that decided.
        #[arg(long)]
        explain: bool,
    },
    /// Score the engine against a labelled sample file
    Eval {
        samples: PathBuf,

        /// Exit with an error if pair accuracy falls below this fraction.
        #[arg(long)]
        min_accuracy: Option<f64>,
    },
    /// Summarize the prototype corpus
    Prototypes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    info!("moodlog v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Add {
            text,
            store_unlabeled,
        } => {
            let text = text.join(" ");
            let engine = engine(&cli.embedder, &config).await?;
            let tags = match engine.infer(&text).await {
                Ok(tags) => tags,
                Err(e) if store_unlabeled => {
                    warn!(error = %e, "storing entry unlabeled");
                    Tags::UNKNOWN
                }
                Err(e) => {
                    return Err(e).context(
                        "entry not saved; retry, or pass --store-unlabeled to keep it untagged",
                    );
                }
            };
            let store = JsonStore::open(&cli.data)?;
            let entry = store.append(&text, tags, Utc::now())?;
            display::print_saved(&entry);
        }
        Commands::Summary { limit } => {
            let store = JsonStore::open(&cli.data)?;
            display::print_entries(&store.latest(limit)?);
        }
        Commands::Classify { text, explain } => {
            let engine = engine(&cli.embedder, &config).await?;
            let results = engine.classify_all(&text.join(" ")).await?;
            display::print_classifications(&results, explain);
        }
        Commands::Eval {
            samples,
            min_accuracy,
        } => {
            let samples = moodlog_ai::load_samples(&samples)?;
            let engine = engine(&cli.embedder, &config).await?;
            let report = moodlog_ai::evaluate(&engine, &samples).await;
            display::print_report(&report);
            if let Some(min) = min_accuracy {
                let got = report.pair_accuracy();
                if got < min {
                    bail!("pair accuracy {got:.3} is below the required {min:.3}");
                }
            }
        }
        Commands::Prototypes => {
            let set = match &config.prototypes {
                Some(path) => PrototypeSet::load(path)?,
                None => PrototypeSet::builtin(),
            };
            display::print_prototypes(&set);
        }
    }

    Ok(())
}

async fn engine(args: &EmbedderArgs, config: &EngineConfig) -> anyhow::Result<InferenceEngine> {
    let adapter = adapter(args)?;
    InferenceEngine::bootstrap(adapter, config).await
}

fn adapter(args: &EmbedderArgs) -> anyhow::Result<Arc<dyn EmbeddingAdapter>> {
    match args.kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::default())),
        EmbedderKind::Onnx => onnx_adapter(args),
        EmbedderKind::Remote => remote_adapter(args),
    }
}

#[cfg(feature = "onnx")]
fn onnx_adapter(args: &EmbedderArgs) -> anyhow::Result<Arc<dyn EmbeddingAdapter>> {
    let embedder = moodlog_ai::OnnxEmbedder::load(&args.model_dir)
        .with_context(|| format!("loading model from {}", args.model_dir.display()))?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "onnx"))]
fn onnx_adapter(_args: &EmbedderArgs) -> anyhow::Result<Arc<dyn EmbeddingAdapter>> {
    bail!("this build has no ONNX support; rebuild with `--features onnx`")
}

#[cfg(feature = "http")]
fn remote_adapter(args: &EmbedderArgs) -> anyhow::Result<Arc<dyn EmbeddingAdapter>> {
    Ok(Arc::new(moodlog_ai::RemoteEmbedder::new(
        args.endpoint.clone(),
        args.model.clone(),
        args.dim,
    )))
}

#[cfg(not(feature = "http"))]
fn remote_adapter(_args: &EmbedderArgs) -> anyhow::Result<Arc<dyn EmbeddingAdapter>> {
    bail!("this build has no HTTP embedding support; rebuild with `--features http`")
}
