use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use adverdict::{AdGroup, BatchOutcome, ComparisonConfig, ComparisonEngine};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "adverdict", about = "Compare test ads against their control ad")]
struct Cli {
    /// JSON comparison config. Built-in defaults are used when omitted.
    #[arg(long, env = "ADVERDICT_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of ad groups, or `-` to read stdin.
    #[arg(long, env = "ADVERDICT_INPUT")]
    input: PathBuf,

    /// Evaluate ad groups in parallel on the blocking thread pool.
    #[arg(long)]
    concurrent: bool,

    /// Keep ads below minImpressions and paused ads.
    #[arg(long)]
    no_prefilter: bool,

    #[arg(long)]
    pretty: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> adverdict::Result<ComparisonConfig> {
    match path {
        Some(p) => ComparisonConfig::from_file(p),
        None => Ok(ComparisonConfig::default()),
    }
}

fn load_groups(input: &Path) -> Result<Vec<AdGroup>, Box<dyn std::error::Error>> {
    let json = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| format!("cannot read {}: {}", input.display(), e))?
    };
    Ok(serde_json::from_str(&json)?)
}

/// Applies the qualifying-ad filter the engine expects to have run upstream.
fn prefilter(groups: Vec<AdGroup>, min_impressions: u64) -> Vec<AdGroup> {
    groups
        .iter()
        .map(|g| {
            let q = g.qualifying(min_impressions);
            if q.ads.len() < g.ads.len() {
                tracing::debug!(
                    ad_group = %g.id,
                    dropped = g.ads.len() - q.ads.len(),
                    min_impressions,
                    "dropped non-qualifying ads"
                );
            }
            q
        })
        .collect()
}

async fn run(cli: Cli) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    let mut groups = load_groups(&cli.input)?;
    if !cli.no_prefilter {
        groups = prefilter(groups, config.min_impressions);
    }

    let engine = ComparisonEngine::new(config)?;
    tracing::info!(
        ad_groups = groups.len(),
        concurrent = cli.concurrent,
        "comparing ad groups"
    );

    let outcome = if cli.concurrent {
        Arc::new(engine).compare_groups_concurrently(groups).await
    } else {
        engine.compare_groups(&groups)
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let pretty = cli.pretty;
    let outcome = match run(cli).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string(&outcome)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("ERROR: failed to serialize results: {}", e);
            std::process::exit(1);
        }
    }
}
