//! # Distiller worker daemon
//!
//! Runs one of the pipeline's stream workers: the scan reconstructor, the
//! job orchestrator, or the HAADF preview worker. Each worker is a single
//! consumer of its partition; scaling out means running more processes.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use distiller_config::Settings;
use distiller_core::broker::{
    TOPIC_FILE_EVENTS, TOPIC_HAADF_FILE_EVENTS, TOPIC_SUBMIT_JOB_EVENTS,
    TOPIC_SYNC_EVENTS,
};
use distiller_core::{
    HaadfWorker, HttpRecordStore, JobOrchestrator, KafkaPublisher,
    ReconstructorTables, ScanReconstructor, SfApiClient, TopicPublisher,
    create_consumer,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments for the worker daemon
#[derive(Parser, Debug)]
#[command(name = "distiller-workerd")]
#[command(about = "Stream worker daemon for the Distiller acquisition pipeline")]
struct Args {
    /// Which worker to run in this process
    #[arg(value_enum)]
    worker: WorkerKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum WorkerKind {
    /// Reconstruct scans from filesystem events
    Scan,
    /// Submit batch jobs and reconcile scheduler state
    Job,
    /// Render and upload HAADF previews
    Haadf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings =
        Arc::new(Settings::from_env().context("failed to load settings")?);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    match args.worker {
        WorkerKind::Scan => run_reconstructor(settings, shutdown).await,
        WorkerKind::Job => run_orchestrator(settings, shutdown).await,
        WorkerKind::Haadf => run_haadf(settings, shutdown).await,
    }
}

async fn run_reconstructor(
    settings: Arc<Settings>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let publisher: Arc<dyn TopicPublisher> =
        Arc::new(KafkaPublisher::new(&settings.kafka_url)?);
    let store = Arc::new(HttpRecordStore::new(&settings)?);
    let tables = ReconstructorTables::restore(&settings.kafka_url, publisher.clone())
        .await
        .context("failed to restore reconstructor tables")?;
    let consumer = create_consumer(
        &settings.kafka_url,
        &[TOPIC_FILE_EVENTS, TOPIC_SYNC_EVENTS],
    )?;

    ScanReconstructor::new(store, publisher, tables, settings.number_of_log_files)
        .run(consumer, shutdown)
        .await
        .context("scan reconstructor failed")
}

async fn run_orchestrator(
    settings: Arc<Settings>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let store = Arc::new(HttpRecordStore::new(&settings)?);
    let sfapi = Arc::new(SfApiClient::new(&settings)?);
    let consumer =
        create_consumer(&settings.kafka_url, &[TOPIC_SUBMIT_JOB_EVENTS])?;

    JobOrchestrator::new(settings, store, sfapi)
        .run(consumer, shutdown)
        .await
        .context("job orchestrator failed")
}

async fn run_haadf(
    settings: Arc<Settings>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let store = Arc::new(HttpRecordStore::new(&settings)?);
    let consumer =
        create_consumer(&settings.kafka_url, &[TOPIC_HAADF_FILE_EVENTS])?;

    HaadfWorker::new(store)
        .run(consumer, shutdown)
        .await
        .context("haadf worker failed")
}
