use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use answerbook_ai::ResolutionContext;
use answerbook_core::{DEFAULT_MAX_LENGTH, DEFAULT_TOP_K, ModelConfig, normalize_utterance};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser)]
#[command(name = "answerbook", version, about = "Resolve utterances to canonical responses")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve `POST /predict` over HTTP.
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,
        #[arg(long, env = "ANSWERBOOK_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
        /// Per-request deadline in seconds.
        #[arg(long, env = "ANSWERBOOK_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Resolve one utterance and print the label.
    Resolve {
        #[command(flatten)]
        artifacts: ArtifactArgs,
        text: String,
        /// Also print the classifier decision and semantic candidates.
        #[arg(long)]
        explain: bool,
    },
    /// Load and cross-validate all artifacts, then print a summary.
    Check {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
    /// Print the normalised form of an utterance.
    Normalize { text: String },
}

#[derive(Args)]
struct ArtifactArgs {
    /// Sequence classifier directory (model.onnx + tokenizer.json).
    #[arg(long, env = "ANSWERBOOK_MODEL_DIR", default_value = "./saved_model")]
    model_dir: PathBuf,
    /// Sentence encoder directory (model.onnx + tokenizer.json).
    #[arg(long, env = "ANSWERBOOK_ENCODER_DIR", default_value = "./sent_transf")]
    encoder_dir: PathBuf,
    /// label2id JSON catalog.
    #[arg(long, env = "ANSWERBOOK_CATALOG", default_value = "./label_mapping.json")]
    catalog: PathBuf,
    /// Parquet file of label-keyed reference embeddings.
    #[arg(
        long,
        env = "ANSWERBOOK_EMBEDDINGS",
        default_value = "./response_embeddings.parquet"
    )]
    embeddings: PathBuf,
    #[arg(long, env = "ANSWERBOOK_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,
    #[arg(long, env = "ANSWERBOOK_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
}

impl ArtifactArgs {
    fn into_config(self) -> ModelConfig {
        ModelConfig {
            classifier_dir: self.model_dir,
            encoder_dir: self.encoder_dir,
            catalog_path: self.catalog,
            embeddings_path: self.embeddings,
            max_length: self.max_length,
            top_k: self.top_k,
        }
    }

    fn load(self) -> anyhow::Result<ResolutionContext> {
        ResolutionContext::load(&self.into_config())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("answerbook v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Serve {
            artifacts,
            bind,
            timeout_secs,
        } => {
            let context = Arc::new(artifacts.load()?);
            server::serve(context, bind, Duration::from_secs(timeout_secs)).await
        }
        Command::Resolve {
            artifacts,
            text,
            explain,
        } => {
            let context = artifacts.load()?;
            let resolution = context.resolve(&text)?;
            if explain {
                println!("normalized: {:?}", resolution.normalized);
                println!("classifier: {}", resolution.classifier_label);
                println!("verdict:    {}", resolution.verdict.as_str());
                println!("candidates:");
                for (rank, c) in resolution.candidates.iter().enumerate() {
                    println!("  {:>2}. {:.4}  {}", rank + 1, c.similarity, c.label);
                }
                println!("response:   {}", resolution.label);
            } else {
                println!("{}", resolution.label);
            }
            Ok(())
        }
        Command::Check { artifacts } => {
            let context = artifacts.load()?;
            println!("labels:             {}", context.catalog().len());
            println!("embedding dim:      {}", context.embedding_dim());
            match context.classifier_classes() {
                Some(n) => println!("classifier classes: {n}"),
                None => println!("classifier classes: dynamic (checked per request)"),
            }
            match context.max_length() {
                Some(n) => println!("max_length:         {n}"),
                None => println!("max_length:         n/a"),
            }
            println!("top_k:              {}", context.top_k());
            println!("ok");
            Ok(())
        }
        Command::Normalize { text } => {
            println!("{}", normalize_utterance(&text));
            Ok(())
        }
    }
}
