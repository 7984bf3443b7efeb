pub mod config;
pub mod domain;
pub mod filtering;
pub mod indexer;
pub mod irc;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod repository;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use indexer::{Registry, SharedRegistry};
use pipeline::Pipeline;
use repository::{InMemoryRepository, LogDispatcher};

const EVENT_BUS_CAPACITY: usize = 100;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| config.general.log_level.clone());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting announcerr");

    let definitions_dir = config.general.definitions_dir.as_ref().map(PathBuf::from);
    let registry = Registry::load(definitions_dir.as_deref(), &config.indexers)
        .context("loading indexer definitions")?;
    let networks = irc::build_network_configs(&registry, &config.indexers);
    if networks.is_empty() {
        warn!("no enabled indexers with IRC support, nothing to watch");
    }
    let registry = Arc::new(SharedRegistry::new(registry));

    let repo = Arc::new(InMemoryRepository::with_filters(
        config
            .filters
            .iter()
            .map(|f| (f.indexers.clone(), f.filter.clone()))
            .collect(),
    ));
    let dispatcher = Arc::new(LogDispatcher);

    let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
    let (announce_tx, announce_rx) = mpsc::channel(config.pipeline.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&registry),
        repo,
        dispatcher,
        None,
        events.clone(),
        config.pipeline.workers,
    ));
    let grace = Duration::from_secs(config.pipeline.shutdown_grace_seconds);
    let pipeline_task = tokio::spawn(Arc::clone(&pipeline).run(announce_rx, shutdown_rx.clone(), grace));

    let sessions = irc::start_sessions(
        networks,
        config.irc.timings(),
        &announce_tx,
        &events,
        &shutdown_rx,
    );
    // sessions hold their own sender clones
    drop(announce_tx);

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("shutdown signal received, draining");

    // phase one: stop intake, phase two: grace period for in-flight work
    shutdown_tx.send(true).ok();

    if timeout(grace + Duration::from_secs(2), pipeline_task)
        .await
        .is_err()
    {
        warn!("pipeline did not drain in time");
    }

    for session in sessions {
        if timeout(Duration::from_secs(2), session).await.is_err() {
            warn!("session did not close in time");
        }
    }

    info!("bye");
    Ok(())
}
