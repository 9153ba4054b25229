//! `rerank` command-line entrypoint.
//!
//! Reads `{"query": ..., "documents": [...]}` from a file argument (or stdin), scores it
//! with an engine built from `RERANK_*` environment variables, and prints the response
//! as JSON.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use serde::{Deserialize, Serialize};

use rerank::{EngineConfig, RerankerEngine, ScoreResponse};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Deserialize)]
struct Request {
    query: String,
    documents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    run: u64,
    cache_hits: usize,
    backend_calls: usize,
    elapsed_ms: f64,
    docs_per_sec: f64,
}

#[derive(Debug, Serialize)]
struct Output {
    backend_state: String,
    initial_batch_size: usize,
    working_batch_size: usize,
    response: ScoreResponse,
    ranked: Vec<(usize, f32)>,
    runs: Vec<RunSummary>,
}

/// Score a reranking request with an engine configured from `RERANK_*` variables.
#[derive(Debug, Parser)]
#[command(name = "rerank")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Score the request N times to show cache effects
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    repeat: u64,

    /// Request JSON file; stdin when omitted
    input: Option<PathBuf>,
}

fn read_request(input: Option<&PathBuf>) -> anyhow::Result<Request> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("request must be {\"query\": ..., \"documents\": [...]}")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let request = read_request(cli.input.as_ref())?;

    let config = EngineConfig::from_env()?;
    let engine = RerankerEngine::from_config(config).await?;

    let mut runs = Vec::new();
    let mut last = ScoreResponse::empty();

    for run in 1..=cli.repeat {
        let response = engine.get_scores(&request.query, &request.documents).await?;
        runs.push(RunSummary {
            run,
            cache_hits: response.stats.cache_hits,
            backend_calls: response.stats.backend_calls,
            elapsed_ms: response.stats.elapsed.as_secs_f64() * 1000.0,
            docs_per_sec: response.stats.docs_per_sec(),
        });
        last = response;
    }

    let output = Output {
        backend_state: engine.backend_state().to_string(),
        initial_batch_size: engine.initial_batch_size(),
        working_batch_size: engine.working_batch_size(),
        ranked: last.ranked(),
        response: last,
        runs,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_single_run_from_stdin() {
        let cli = Cli::try_parse_from(["rerank"]).unwrap();
        assert_eq!(cli.repeat, 1);
        assert!(cli.input.is_none());
    }

    #[test]
    fn test_cli_parses_repeat_and_input() {
        let cli = Cli::try_parse_from(["rerank", "--repeat", "3", "request.json"]).unwrap();
        assert_eq!(cli.repeat, 3);
        assert_eq!(cli.input, Some(PathBuf::from("request.json")));
    }

    #[test]
    fn test_cli_rejects_zero_repeat() {
        assert!(Cli::try_parse_from(["rerank", "--repeat", "0"]).is_err());
    }
}
