use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tessera_api::config::ServerConfig;
use tessera_api::router::build_app_router;
use tessera_api::state::AppState;
use tessera_db::DbPool;

const DEFAULT_LOG_FILTER: &str = "tessera_api=debug,tower_http=debug";
const DEFAULT_MAX_CONNECTIONS: u32 = 20;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        require_image_containment = config.require_image_containment,
        max_import_features = config.max_import_features,
        "Loaded server configuration"
    );

    let pool = connect_database().await;

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app_router(AppState {
        pool: pool.clone(),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(%addr, "Annotation service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Draining database pool");
    if tokio::time::timeout(shutdown_timeout, pool.close()).await.is_err() {
        tracing::warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Database pool did not close in time"
        );
    }
    tracing::info!("Shutdown complete");
}

/// `RUST_LOG` filters; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Connect, verify, and migrate. Startup aborts on any failure.
async fn connect_database() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .map(|v| v.parse().expect("DATABASE_MAX_CONNECTIONS must be a positive integer"))
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    let pool = tessera_db::create_pool(&url, max_connections)
        .await
        .expect("Failed to connect to database");
    tessera_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tessera_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!(max_connections, "Database ready");
    pool
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
