use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hashnode_sync::changeset::{self, RunMode};
use hashnode_sync::config::Config;
use hashnode_sync::hashnode::HashnodeClient;
use hashnode_sync::reconciler::Reconciler;
use hashnode_sync::report;

/// Publish markdown posts from a git repository to Hashnode.
#[derive(Debug, Parser)]
#[command(name = "hashnode-sync", version, about)]
struct Args {
    /// Branch or ref being resynced in full (informational; the checked-out
    /// tree is what gets published).
    r#ref: Option<String>,

    /// Base revision for change detection; omit for a full resync.
    #[arg(long)]
    base: Option<String>,

    /// Head revision for change detection.
    #[arg(long, default_value = "HEAD")]
    head: String,

    /// File containing a newline-separated changed-file list precomputed by
    /// the host. Takes precedence over revision-based detection.
    #[arg(long)]
    changed_files: Option<PathBuf>,

    /// Repository root to scan.
    #[arg(long, default_value = ".")]
    repo_dir: PathBuf,
}

impl Args {
    fn run_mode(&self) -> RunMode {
        if let Some(path) = &self.changed_files {
            return RunMode::List { path: path.clone() };
        }
        match &self.base {
            Some(base) => RunMode::Diff {
                base: base.clone(),
                head: self.head.clone(),
            },
            None => RunMode::Full,
        }
    }
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<bool> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let args = Args::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let mode = args.run_mode();
    if let Some(reference) = &args.r#ref {
        info!(%reference, "Full resync requested");
    }
    info!(?mode, repo_dir = %args.repo_dir.display(), "Starting hashnode-sync");

    let files = changeset::resolve(&args.repo_dir, &mode)
        .await
        .context("Failed to resolve candidate files")?;
    info!(count = files.len(), "Resolved candidate markdown files");

    let client = Arc::new(HashnodeClient::new(&config));
    let reconciler = Reconciler::new(client, &config);
    let records = reconciler.run(&args.repo_dir, &files).await;

    let summary = report::render(&records);
    println!("{summary}");

    if let Some(path) = &config.results_path {
        tokio::fs::write(path, &summary)
            .await
            .with_context(|| format!("Failed to write results file: {}", path.display()))?;
        info!(path = %path.display(), "Results summary written");
    }

    let failed = report::run_failed(&records);
    if failed {
        error!("One or more files failed; see summary above");
    }
    Ok(!failed)
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashnode_sync=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for CI log collection
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for local runs
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
