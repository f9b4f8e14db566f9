use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use querytrail_backend::config;
use querytrail_backend::search::SqliteQueryStore;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querytrail_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::init_config().map_err(anyhow::Error::msg)?;
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());

    let pool = SqlitePool::connect(&database_url).await?;

    let store = SqliteQueryStore::new(pool);
    store.init().await?;

    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/version", get(api::server::version_info))
        .route("/api/search", post(api::search::record))
        .route("/api/search_analytics", get(api::analytics::user_analytics))
        .route(
            "/api/global_analytics",
            get(api::analytics::global_analytics),
        )
        .route("/api/suggestions", get(api::suggestions::suggestions))
        .route(
            "/api/popular_searches",
            get(api::suggestions::popular_searches),
        )
        .route("/api/insights", get(api::insights::list_insights))
        .route("/api/top_queries", get(api::insights::top_queries))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
