use std::sync::Arc;

use calorie_api::{
    create_api_router, init_tracing, ApiConfig, ApiError, ApiResult, DbConfig, ErrorCode,
    PgConnector, StoreBackend,
};
use calorie_storage::{InMemoryFoodStore, MemoryConnector, StoreConnector, StoreHandle};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env();
    init_tracing(config.log_format)?;

    let connector: Arc<dyn StoreConnector> = match config.store_backend {
        StoreBackend::Postgres => Arc::new(PgConnector::new(DbConfig::from_env())),
        StoreBackend::Memory => Arc::new(MemoryConnector::new(Arc::new(
            InMemoryFoodStore::seeded(),
        ))),
    };
    // Connects lazily on the first request.
    let store = Arc::new(StoreHandle::new(connector));

    let app = create_api_router(&config, store);

    let addr = config.bind_addr().ok_or_else(|| {
        ApiError::new(
            ErrorCode::Internal,
            format!("Invalid bind address {}:{}", config.bind_host, config.port),
        )
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        ApiError::new(ErrorCode::Internal, format!("Failed to bind {}: {}", addr, e))
    })?;

    info!(
        %addr,
        prefix = %config.route_prefix,
        store = ?config.store_backend,
        "Calorie API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("Server error: {}", e)))?;

    info!("Calorie API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
}
