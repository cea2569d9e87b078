mod config;
mod db;
mod documents;
mod errors;
mod evaluation;
mod jobs;
mod llm_client;
mod models;
mod queue;
mod rag;
mod routes;
mod state;
mod worker;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::documents::DocumentStore;
use crate::evaluation::Evaluator;
use crate::jobs::{JobStore, PgJobStore};
use crate::llm_client::{LlmClient, LlmService};
use crate::queue::{RedisWorkQueue, WorkQueue};
use crate::rag::ingest::seed_defaults;
use crate::rag::{ContextRetriever, LinearScanIndex, PgReferenceStore, ReferenceStore};
use crate::routes::build_router;
use crate::state::AppState;
use crate::worker::Worker;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Evaluator API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize Redis work queue
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue: Arc<dyn WorkQueue> =
        Arc::new(RedisWorkQueue::connect(redis, config.queue_name.clone()).await?);

    // Initialize LLM client
    let client = LlmClient::new(config.llm.clone())?;
    info!(
        "LLM client initialized (model: {}, base url: {})",
        client.model(),
        config.llm.base_url
    );
    let llm: Arc<dyn LlmService> = Arc::new(client);

    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db.clone()));
    let references: Arc<dyn ReferenceStore> = Arc::new(PgReferenceStore::new(db));

    // Seed the retrieval corpus; the service still starts without it
    match seed_defaults(llm.as_ref(), references.as_ref(), config.llm_retry_policy()).await {
        Ok(0) => {}
        Ok(n) => info!("Seeded {n} reference document(s)"),
        Err(e) => warn!("Reference seeding failed: {e}"),
    }

    let pending = jobs.list_pending().await?;
    if !pending.is_empty() {
        warn!(
            "{} job(s) left queued or processing from a previous run",
            pending.len()
        );
    }

    // Build the pipeline and start the worker
    let retriever = ContextRetriever::new(
        llm.clone(),
        Arc::new(LinearScanIndex::new(references.clone())),
        config.retrieval_top_k,
        config.llm_retry_policy(),
    );
    let evaluator = Arc::new(Evaluator::new(
        llm.clone(),
        retriever,
        config.llm_retry_policy(),
    ));
    let worker = Worker::new(
        jobs.clone(),
        queue.clone(),
        evaluator,
        config.worker_config(),
    )
    .spawn();

    // Build app state
    let state = AppState {
        jobs,
        queue,
        references,
        documents: Arc::new(DocumentStore::new(&config.upload_dir, config.max_file_size)),
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, waiting for worker");
    worker.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
