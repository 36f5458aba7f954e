//! `SchoolDesk` API server entry point.
//!
//! Connects the school store, registers audit sinks, and starts the Axum
//! HTTP server with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use schooldesk_core::audit::AuditLog;
use schooldesk_core::audit_file::FileAuditSink;
use schooldesk_core::ratelimit::FixedWindowLimiter;
use schooldesk_core::trial::TrialPolicy;
use schooldesk_store::{MemorySchoolStore, SchoolStore};

use schooldesk_server::config::{ServerConfig, StoreBackendType};
use schooldesk_server::routes;
use schooldesk_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(store = config.store.kind(), "SchoolDesk API starting");

    let state = build_app_state(&config).await?;
    let app = build_router(state, &config)?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "SchoolDesk API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("SchoolDesk API stopped");
    Ok(())
}

/// Connect the configured store and audit sinks.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let audit = Arc::new(AuditLog::new());

    let schools: Option<Arc<dyn SchoolStore>> = match &config.store {
        StoreBackendType::Unconfigured => {
            warn!("no school store configured; lookups and signups will fail");
            None
        }
        StoreBackendType::Memory { seed_file } => {
            let store = match seed_file {
                Some(path) => MemorySchoolStore::from_seed_file(path)
                    .await
                    .with_context(|| format!("failed to seed memory store from {path}"))?,
                None => MemorySchoolStore::new(),
            };
            info!(schools = store.len().await, "using in-memory school store (data will not persist)");
            Some(Arc::new(store))
        }
        #[cfg(feature = "postgres")]
        StoreBackendType::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL school store");
            let store = schooldesk_store::PostgresSchoolStore::connect(url)
                .await
                .context("failed to connect to PostgreSQL school store")?;

            if config.audit_postgres {
                let sink =
                    schooldesk_core::audit_postgres::PostgresAuditSink::new(store.pool().clone())
                        .await
                        .context("failed to prepare PostgreSQL audit table")?;
                audit.add_sink(Arc::new(sink)).await;
                info!("postgres audit sink registered");
            }

            Some(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackendType::Postgres { .. } => {
            anyhow::bail!("PostgreSQL store requested but feature 'postgres' is not enabled");
        }
    };

    if let Some(ref path) = config.audit_file_path {
        let sink = FileAuditSink::open(path)
            .await
            .with_context(|| format!("failed to open audit file {path}"))?;
        audit.add_sink(Arc::new(sink)).await;
        info!(path = %path, "file audit sink registered");
    }

    Ok(Arc::new(AppState {
        schools,
        rate_limiter: Arc::new(
            FixedWindowLimiter::new(
                config.rate_limit_max,
                Duration::from_secs(config.rate_limit_window_secs),
            )
            .with_capacity(config.rate_limit_capacity),
        ),
        audit,
        trial_policy: TrialPolicy::new(config.trial_days),
        onboarding_url: config.onboarding_url.clone(),
    }))
}

/// Wrap the API routes in tracing, CORS and security headers.
fn build_router(state: Arc<AppState>, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin = match &config.cors_origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid SCHOOLDESK_CORS_ORIGIN '{origin}'"))?,
        ),
        None => AllowOrigin::from(Any),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Ok(routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        )))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
