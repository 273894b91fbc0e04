//! Application entry point: orchestrator binary wiring the catalog store,
//! download lifecycle, event bus, acquisition pipeline, and compatibility
//! facade together.
//!
//! Sequencing: load config -> build pool -> run migrations -> construct
//! repositories -> construct event bus -> spawn reconciler -> build
//! router -> serve with graceful shutdown. No web UI asset serving, no
//! notification dispatch, no streaming aggregator.

mod cli;

use std::sync::Arc;

use clap::Parser;
use gatherarr_api::{build_router, AppState, TagStore};
use gatherarr_core::config::Config;
use gatherarr_core::domain::NoopMetadataLookup;
use gatherarr_core::events::{AuditLogger, EventBus, EventProcessor};
use gatherarr_core::services::acquisition::AcquisitionPipeline;
use gatherarr_core::services::manager::DownloadManager;
use gatherarr_core::services::reconciler::Reconciler;
use gatherarr_downloaders::{ManualDownloader, QBittorrentClient, QBittorrentConfig};
use gatherarr_indexers::{ProwlarrClient, ProwlarrConfig};
use gatherarr_infrastructure::repositories::{
    PostgresAuditRepository, PostgresContentRepository, PostgresDownloadRepository,
    PostgresEpisodeRepository, PostgresFileRepository,
};
use gatherarr_infrastructure::{create_pool, migrate, DatabaseConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(&args.log_level);

    info!("starting gatherarr");

    let config = Config::from_env()?;
    info!(bind_addr = %config.bind_addr, "configuration loaded");

    let pool = create_pool(DatabaseConfig {
        database_url: config.database_url.clone(),
        ..DatabaseConfig::default()
    })
    .await?;
    migrate(&pool).await?;
    info!("database migrations applied");

    if args.migrate_only {
        info!("migrate-only mode, exiting");
        return Ok(());
    }

    let content_repo = Arc::new(PostgresContentRepository::new(pool.clone()));
    let episode_repo = Arc::new(PostgresEpisodeRepository::new(pool.clone()));
    let file_repo = Arc::new(PostgresFileRepository::new(pool.clone()));
    let download_repo = Arc::new(PostgresDownloadRepository::new(pool.clone()));
    let audit_repo = Arc::new(PostgresAuditRepository::new(pool.clone()));

    let downloader = build_downloader()?;
    let search = build_search(&config)?;

    let event_bus = Arc::new(EventBus::new());

    let processor = EventProcessor::new(&event_bus).add_handler(Arc::new(AuditLogger::new(
        audit_repo.clone() as Arc<dyn gatherarr_core::domain::AuditRepository>,
    )));
    tokio::spawn(processor.run());
    info!("event processor started");

    let manager = Arc::new(DownloadManager::new(
        download_repo.clone(),
        downloader.clone(),
        event_bus.clone(),
    ));
    let acquisition = Arc::new(AcquisitionPipeline::new(
        search,
        manager.clone(),
        event_bus.clone(),
    ));

    let cancel = CancellationToken::new();
    let reconciler = Reconciler::new(download_repo.clone(), downloader.clone(), event_bus.clone());
    let reconciler_handle = {
        let cancel = cancel.clone();
        let interval = config.reconciler_interval;
        tokio::spawn(async move {
            reconciler.run(interval, cancel).await;
        })
    };
    info!("reconciler started");

    let state = AppState {
        config: Arc::new(config.clone()),
        content_repo,
        episode_repo,
        file_repo,
        download_repo,
        audit_repo,
        downloader,
        metadata: Arc::new(NoopMetadataLookup),
        manager,
        acquisition,
        event_bus,
        task_tracker: None,
        tags: Arc::new(TagStore::default()),
        started_at: chrono::Utc::now(),
    };

    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "HTTP server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    reconciler_handle.await.ok();

    info!("gatherarr shut down");
    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_downloader() -> anyhow::Result<Arc<dyn gatherarr_core::domain::Downloader>> {
    let kind = std::env::var("DOWNLOAD_CLIENT").unwrap_or_else(|_| "qbittorrent".to_string());
    match kind.as_str() {
        "manual" => {
            info!("download client: manual (no-op)");
            Ok(Arc::new(ManualDownloader::new()))
        }
        _ => {
            let config = QBittorrentConfig {
                base_url: std::env::var("QBITTORRENT_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
                username: std::env::var("QBITTORRENT_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                password: std::env::var("QBITTORRENT_PASSWORD").unwrap_or_default(),
                ..QBittorrentConfig::default()
            };
            info!(base_url = %config.base_url, "download client: qbittorrent");
            Ok(Arc::new(QBittorrentClient::new(config)?))
        }
    }
}

fn build_search(config: &Config) -> anyhow::Result<Arc<dyn gatherarr_core::domain::Search>> {
    let api_key = std::env::var("PROWLARR_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("PROWLARR_API_KEY not set; search requests will fail authentication at the indexer");
    }
    let prowlarr_config = ProwlarrConfig {
        base_url: config.indexer_base_url.clone(),
        api_key,
        ..ProwlarrConfig::default()
    };
    Ok(Arc::new(ProwlarrClient::new(prowlarr_config)?))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
