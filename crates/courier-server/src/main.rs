//! courier-server
//!
//! API surface と worker の配線。構成を読み、ストアと下流クライアントを
//! 組み立て、worker を起動して axum でリッスンします。

mod api;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier_core::app::Worker;
use courier_core::impls::{FsTaskStore, HttpDownstreamClient, InMemoryTaskStore};
use courier_core::ports::{SystemClock, TaskStore, UlidGenerator};

use crate::api::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store: Arc<dyn TaskStore> = match &config.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using file-backed task store");
            Arc::new(FsTaskStore::open(dir).await.context("opening task store")?)
        }
        None => {
            info!("using in-memory task store (tasks are lost on restart)");
            Arc::new(InMemoryTaskStore::new())
        }
    };

    let downstream = Arc::new(
        HttpDownstreamClient::new(&config.downstream_url, config.downstream_deadline())
            .context("invalid downstream URL")?,
    );

    let worker = Worker::new(Arc::clone(&store), downstream, config.tick_interval()).spawn();

    let state = Arc::new(AppState {
        store,
        ids: Arc::new(UlidGenerator::new(SystemClock)),
        clock: Arc::new(SystemClock),
    });

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, downstream = %config.downstream_url, "courier listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down worker");
    worker.shutdown_and_join().await;

    Ok(())
}

async fn shutdown_signal() {
    // ctrl_c が取れない環境なら graceful shutdown は諦めて走り続ける
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
