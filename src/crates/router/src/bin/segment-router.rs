//! segment-router CLI
//!
//! Loads a router file, routes one query and prints the response as JSON.

use anyhow::Context;
use clap::Parser;
use router::{CancellationToken, Router, RouterFile};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "segment-router")]
#[command(about = "Chunk content from a data source, run each segment through a model, merge the results", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Router file (YAML)
    #[arg(short, long, env = "SEGMENT_ROUTER_CONFIG")]
    config: PathBuf,

    /// Binding label to fetch from
    #[arg(short, long)]
    binding: String,

    /// Rule name to route through
    #[arg(short, long)]
    rule: String,

    /// Request metadata as a JSON object, echoed in the response
    #[arg(short, long)]
    metadata: Option<String>,

    /// Query passed to the data source
    query: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let metadata = cli
        .metadata
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--metadata must be valid JSON")?;

    let file = RouterFile::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let router = Router::from_file(file)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling route");
            on_interrupt.cancel();
        }
    });

    let outcome = router
        .route_with_cancel(&cli.binding, &cli.query, &cli.rule, metadata, cancel)
        .await;
    router.close().await;

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(stage = %e.stage(), segment = ?e.segment(), "route failed");
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
