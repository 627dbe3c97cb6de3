use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use event_relay::config::Settings;
use event_relay::postgres::PostgresPool;
use event_relay::server::{create_app, AppState};
use event_relay::telemetry::init_telemetry;
use event_relay::triggers::RedisEventSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Keep the guard alive until exit so spans are flushed
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    let postgres = match settings.database.url {
        Some(_) => Some(PostgresPool::new(&settings.database).await?),
        None => None,
    };

    let redis = match &settings.redis.url {
        Some(url) => match event_relay::redis::connect(url).await {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable at startup, lanes fall back to memory");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(&settings, postgres.clone(), redis)?;
    tracing::info!("Application state initialized");

    // Inbound events from Redis Pub/Sub
    let subscriber = settings.redis.url.as_ref().map(|url| {
        Arc::new(RedisEventSubscriber::new(
            url.clone(),
            &settings.redis,
            state.bus.clone(),
            state.redis_health.clone(),
        ))
    });

    let shutdown_tx = match &subscriber {
        Some(subscriber) => subscriber.shutdown_signal(),
        None => tokio::sync::broadcast::channel::<()>(1).0,
    };

    let redis_handle = match subscriber {
        Some(subscriber) => Some(tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis event subscriber failed");
            }
        })),
        None => {
            tracing::info!("No Redis URL configured, Redis event subscriber disabled");
            None
        }
    };

    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    if let Some(handle) = redis_handle {
        let _ = handle.await;
    }
    if let Some(pool) = postgres {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
}
