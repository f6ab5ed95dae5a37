use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagepack_server::config::Config;
use stagepack_server::db::DatabasePool;
use stagepack_server::handlers;
use stagepack_server::services::{HttpQrService, InventoryService, LabelService, PackListService};
use stagepack_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagepack_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting StagePack server...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    // Initialize database connection
    let db_pool = DatabasePool::new(&config).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    // Initialize services
    let pack_list_service = Arc::new(PackListService::new(db_pool.clone()));
    let inventory_service = Arc::new(InventoryService::new(db_pool.clone()));
    let qr_service = Arc::new(HttpQrService::new(&config.labels)?);
    let label_service = Arc::new(LabelService::new(
        qr_service,
        config.labels.public_base_url.clone(),
    ));

    let app_state: AppState = (pack_list_service, inventory_service, label_service);

    let api_routes = Router::new()
        // Pack list routes
        .route(
            "/pack_lists",
            get(handlers::list_pack_lists).post(handlers::create_pack_list),
        )
        .route(
            "/pack_lists/:id",
            get(handlers::get_pack_list)
                .put(handlers::update_pack_list)
                .delete(handlers::delete_pack_list),
        )
        .route("/pack_lists/:id/tree", get(handlers::get_pack_list_tree))
        .route(
            "/pack_lists/:id/containers",
            post(handlers::create_container).put(handlers::replace_containers),
        )
        .route(
            "/pack_lists/:id/containers/:container_id",
            get(handlers::get_container)
                .put(handlers::update_container)
                .delete(handlers::delete_container),
        )
        .route(
            "/pack_lists/:id/containers/:container_id/move",
            post(handlers::move_container),
        )
        .route(
            "/pack_lists/:id/containers/:container_id/props",
            post(handlers::add_prop_to_container),
        )
        .route(
            "/pack_lists/:id/containers/:container_id/props/:prop_id",
            put(handlers::update_prop_in_container).delete(handlers::remove_prop_from_container),
        )
        // Shipping routes
        .route("/pack_lists/:id/shipping", put(handlers::update_shipping))
        .route(
            "/pack_lists/:id/shipping/dispatch",
            post(handlers::dispatch_shipment),
        )
        .route("/pack_lists/:id/shipping/ship", post(handlers::ship_shipment))
        .route(
            "/pack_lists/:id/shipping/arrive",
            post(handlers::arrive_shipment),
        )
        .route(
            "/pack_lists/:id/shipping/lost",
            post(handlers::report_shipment_lost),
        )
        // Label routes
        .route("/pack_lists/:id/labels", post(handlers::generate_labels))
        // Prop inventory routes
        .route("/props", get(handlers::list_props))
        .route("/props/:id", get(handlers::get_prop))
        .with_state(app_state.clone());

    // The label viewer lives outside /api/v1 so the URL printed on a label
    // stays short.
    let viewer_routes = Router::new()
        .route("/c/:container_id", get(handlers::view_container))
        .with_state(app_state);

    let app = Router::new()
        .route("/", get(root))
        .route("/api/v1/health", get(health_check))
        .merge(viewer_routes)
        .nest("/api/v1", api_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_credentials(false),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> &'static str {
    "StagePack Server"
}

async fn health_check() -> &'static str {
    "OK"
}
