use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "floodsql",
    version,
    about = "Text-to-SQL benchmark harness for flood-management geodata"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download the dataset snapshot from the Hugging Face hub
    Fetch(FetchArgs),
    /// Print the schema of every registered parquet table
    Preview(PreviewArgs),
    /// Build the metadata JSON document from parquet schemas and descriptions
    Metadata(MetadataArgs),
    /// Execute reference SQL against the dataset and record results
    Exec(ExecArgs),
    /// Run the benchmark: retrieve, prompt, call the model, save predictions
    Run(RunArgs),
    /// Score a predictions file per difficulty tier
    Eval(EvalArgs),
    Version,
}

#[derive(Parser, Clone)]
pub struct FetchArgs {
    /// Dataset repository id on the hub
    #[arg(long, default_value = floodsql_core::hub::DEFAULT_REPO)]
    pub repo: String,

    #[arg(long, default_value = "data")]
    pub out: PathBuf,
}

#[derive(Parser, Clone)]
pub struct PreviewArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Parser, Clone)]
pub struct MetadataArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// YAML document with column descriptions and the global rule set
    #[arg(long)]
    pub descriptions: PathBuf,

    #[arg(long, default_value = "data/metadata_parquet.json")]
    pub out: PathBuf,

    /// Sample rows embedded per table
    #[arg(long, default_value_t = 3)]
    pub sample_rows: usize,
}

#[derive(Parser, Clone)]
pub struct ExecArgs {
    /// Benchmark file (JSON array or JSONL)
    #[arg(long)]
    pub benchmark: PathBuf,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Results JSONL with row counts and result sets per item
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Error summary text file
    #[arg(long)]
    pub errors_out: Option<PathBuf>,

    /// Run a single item by id and print its result
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub timeout_seconds: u64,

    /// Rows shown per result in the console report
    #[arg(long, default_value_t = 5)]
    pub limit_output: usize,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Benchmark file (JSON array or JSONL)
    #[arg(long)]
    pub benchmark: PathBuf,

    #[arg(long, default_value = "data/metadata_parquet.json")]
    pub metadata: PathBuf,

    /// Predictions JSONL written by the run
    #[arg(long)]
    pub out: PathBuf,

    /// Optional YAML run configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = ".floodsql/floodsql.db")]
    pub db: PathBuf,

    /// Model name sent to the provider
    #[arg(long)]
    pub model: Option<String>,

    /// llm provider (openai|fake)
    #[arg(long)]
    pub provider: Option<String>,

    /// embedder provider (openai|fake)
    #[arg(long)]
    pub embedder: Option<String>,

    #[arg(long)]
    pub embedding_model: Option<String>,

    #[arg(long)]
    pub parallel: Option<usize>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Fixed table top-K (default: per-tier 3/4/5)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Force refresh of cached corpus embeddings
    #[arg(long)]
    pub refresh_embeddings: bool,
}

#[derive(Parser, Clone)]
pub struct EvalArgs {
    /// Predictions JSONL produced by `floodsql run`
    #[arg(long)]
    pub predictions: PathBuf,

    /// Scoring mode: exec (result-set match) or semantic (SQL similarity)
    #[arg(long, default_value = "exec")]
    pub mode: String,

    /// Dataset directory (required for exec mode)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Exec results JSONL with precomputed reference results
    #[arg(long)]
    pub expected: Option<PathBuf>,

    /// embedder provider for semantic mode (openai|fake)
    #[arg(long, default_value = "openai")]
    pub embedder: String,

    #[arg(long, default_value = "text-embedding-3-large")]
    pub embedding_model: String,

    #[arg(long, default_value_t = 30)]
    pub timeout_seconds: u64,

    /// Scores JSON report
    #[arg(long, default_value = "scores.json")]
    pub out: PathBuf,

    /// Optional JUnit XML for CI gating
    #[arg(long)]
    pub junit: Option<PathBuf>,
}
