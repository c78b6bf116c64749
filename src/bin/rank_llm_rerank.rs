//! rank-llm-rerank: 对 JSON Lines 检索结果表做列表式大模型重排
//!
//! Reads retrieved rows (one JSON object per line with `qid`, `query`,
//! `docno`, `score` and a text column), reranks every query, and writes the
//! reranked rows back as JSON Lines.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use rank_llm_rerank::engine::IdentityAgent;
use rank_llm_rerank::types::{read_jsonl_rows, write_jsonl_rows};
use rank_llm_rerank::{ConfigOverrides, LlmReRanker, LlmRerankerConfig, RerankedRow, RetrievedRow};

#[derive(Parser)]
#[command(name = "rank-llm-rerank")]
#[command(about = "Listwise LLM reranking over retrieved result tables", version)]
struct Cli {
    /// YAML config file (RANK_LLM_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rerank a JSON Lines table
    Rerank {
        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "-")]
        output: String,
        /// Model reference
        #[arg(long)]
        model: Option<String>,
        /// Candidate pool size
        #[arg(long)]
        top_k: Option<usize>,
        /// Sliding window size
        #[arg(long)]
        window_size: Option<usize>,
        /// Sliding window stride
        #[arg(long)]
        step_size: Option<usize>,
        /// Column holding the document text
        #[arg(long)]
        text_key: Option<String>,
        /// Shuffle candidates before ranking
        #[arg(long)]
        shuffle: bool,
        /// Log every prompt and response
        #[arg(long)]
        print_prompts: bool,
        /// Keep the retrieved order instead of calling a model
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LlmRerankerConfig> {
    let config = match path {
        Some(path) => LlmRerankerConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LlmRerankerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn read_rows(input: &str) -> anyhow::Result<Vec<RetrievedRow>> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(input).with_context(|| format!("opening {input}"))?;
        Box::new(BufReader::new(file))
    };
    read_jsonl_rows(reader).with_context(|| format!("reading rows from {input}"))
}

fn write_rows(output: &str, rows: &[RerankedRow]) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = if output == "-" {
        Box::new(io::stdout().lock())
    } else {
        let file = std::fs::File::create(output).with_context(|| format!("creating {output}"))?;
        Box::new(file)
    };
    write_jsonl_rows(BufWriter::new(writer), rows)
        .with_context(|| format!("writing rows to {output}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rank_llm_rerank=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Command::Rerank {
            input,
            output,
            model,
            top_k,
            window_size,
            step_size,
            text_key,
            shuffle,
            print_prompts,
            dry_run,
        } => {
            let overrides = ConfigOverrides {
                model,
                top_k_candidates: top_k,
                window_size,
                step_size,
                text_key,
                shuffle_candidates: shuffle,
                print_prompts_responses: print_prompts,
            };
            let config = overrides.apply(config)?;

            let stage = if dry_run {
                LlmReRanker::with_agent(config, Arc::new(IdentityAgent))?
            } else {
                LlmReRanker::new(config)?
            };

            let rows = read_rows(&input)?;
            info!(rows = rows.len(), "read retrieved rows");
            let reranked = stage.transform_grouped(rows).await?;

            write_rows(&output, &reranked)?;
            info!(rows = reranked.len(), "wrote reranked rows");
        }
    }
    Ok(())
}
