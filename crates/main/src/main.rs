//! 主应用程序入口
//!
//! 加载配置，装配存储与服务，启动过期清扫任务和 Axum Web API。

use std::sync::Arc;

use anyhow::Context;
use application::{Clock, ExpirationSweeper, MatchingSettings, StoreTimeouts, SystemClock};
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, EngineSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(config = %config.sanitize(), "configuration loaded");

    let infra = Infrastructure::connect(InfrastructureConfig {
        backend: config.storage.backend,
        database_url: config.storage.database_url.clone(),
        max_connections: config.storage.max_connections,
        connect_attempts: config.storage.connect_attempts,
        bcrypt_cost: config.security.bcrypt_cost,
    })
    .await
    .context("failed to initialise storage")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(
        &infra,
        clock,
        EngineSettings {
            matching: MatchingSettings {
                radius_meters: config.matching.radius_meters,
                link_ttl: config.link_ttl(),
            },
            timeouts: StoreTimeouts {
                point: config.point_timeout(),
                scan: config.scan_timeout(),
            },
            sweep_batch_limit: config.sweep.batch_limit,
        },
    );

    let shutdown = CancellationToken::new();
    let sweeper = ExpirationSweeper::new(state.link_service.clone(), config.sweep_interval())
        .spawn(shutdown.clone());

    let app = router(state);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "linkapp server listening");

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            serve_shutdown.cancel();
        })
        .await
        .context("http server failed")?;

    // 服务器因其他原因退出时也要停止清扫
    shutdown.cancel();
    if let Err(err) = sweeper.await {
        tracing::warn!(error = %err, "expiration sweeper task ended abnormally");
    }
    if let Some(pool) = infra.pool {
        pool.close().await;
    }

    tracing::info!("linkapp server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
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
    tracing::info!("shutdown signal received");
}
