use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use repo_ingest::infrastructure::{source, storage};
use repo_ingest::services::worker::IngestWorker;
use repo_ingest::{IngestConfig, IngestPipeline, RunOutcome};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Run the pipeline once and exit
    Once,
    /// Run the pipeline on a fixed interval until interrupted
    Schedule,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value_t = Mode::Once)]
    mode: Mode,

    /// Seconds between scheduled runs (overrides INGEST_INTERVAL_SECS)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Maximum repositories per run (overrides INGEST_MAX_REPOSITORIES)
    #[arg(long)]
    max_repos: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = IngestConfig::from_env();
    if let Some(interval) = args.interval {
        config.interval_secs = interval;
    }
    if let Some(max_repos) = args.max_repos {
        config.max_repositories = max_repos;
    }
    config.validate()?;

    info!(
        "🚀 Starting repo-ingest [Mode: {:?}] languages={:?} window={}d cap={} bucket={}",
        args.mode,
        config.languages,
        config.lookback_days,
        config.max_repositories,
        config.storage.bucket
    );

    let host = source::setup_source(&config)?;
    let storage_service = storage::setup_storage(&config.storage).await?;
    let pipeline = Arc::new(IngestPipeline::new(host, storage_service));

    match args.mode {
        Mode::Once => {
            let outcome = pipeline.run_once(&config).await;
            report(&outcome);
        }
        Mode::Schedule => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let worker = IngestWorker::new(pipeline, config, shutdown_rx);
            let handle = tokio::spawn(worker.run(report));

            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
            let runs = handle.await?;
            info!("🛑 Scheduler stopped after {} runs.", runs);
        }
    }

    Ok(())
}

fn report(outcome: &RunOutcome) {
    match serde_json::to_string(outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize run outcome: {}", e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, stopping after the current run...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, stopping after the current run...");
        },
    }
}
