use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use crate::config::settings::{AppConfig, StorageConfig};
use crate::infrastructure::db::pool::{connect_to_db, run_migrations};
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::ObjectStore;
use crate::infrastructure::storage::local::LocalObjectStore;
use crate::infrastructure::storage::s3::StorageService;
use crate::modules::encoder::ffmpeg::FfmpegEncoder;
use crate::modules::job::repository::JobRepository;
use crate::modules::job::service::JobTracker;
use crate::modules::job::store::{JobStore, MemoryJobStore};
use crate::modules::transcode::orchestrator::TranscodeOrchestrator;
use crate::modules::transcode::paths::PathPolicy;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting transcoder...");

    let config = AppConfig::new()?;
    info!(
        intake = %config.intake_prefix,
        output = %config.output_prefix,
        timeout_secs = config.job_timeout_secs,
        max_memory_bytes = config.max_memory_bytes,
        "Pipeline configured"
    );

    let store: Arc<dyn ObjectStore> = match &config.storage {
        StorageConfig::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
        } => Arc::new(StorageService::new(endpoint, region, access_key, secret_key)),
        StorageConfig::Local { root } => Arc::new(LocalObjectStore::new(root.clone()).await?),
    };

    let job_store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => {
            let pool = connect_to_db(url).await?;
            run_migrations(&pool).await?;
            Arc::new(JobRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, job status is kept in memory only");
            Arc::new(MemoryJobStore::new())
        }
    };
    let jobs = JobTracker::new(job_store);

    let encoder = FfmpegEncoder::new(
        config.ffmpeg_path.clone(),
        Duration::from_secs(config.job_timeout_secs),
    );

    let orchestrator = Arc::new(TranscodeOrchestrator::new(
        store,
        Arc::new(encoder),
        jobs.clone(),
        PathPolicy::new(config.intake_prefix.clone(), config.output_prefix.clone()),
        config.profile.clone(),
        config.scratch_dir.clone(),
    ));

    if let Some(url) = &config.rabbitmq_url {
        let queue = RabbitMqService::new(url).await?;
        tokio::spawn(workers::transcoder::start_transcoder_worker(
            queue,
            config.trigger_queue.clone(),
            orchestrator.clone(),
        ));
    } else {
        info!("RABBITMQ_URL not set, accepting triggers over HTTP only");
    }

    let app = app::create_app(AppState::new(orchestrator, jobs));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
