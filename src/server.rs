/// HTTP server setup and routing
use crate::{
    config::AssetStoreConfig,
    context::AppContext,
    error::{HubError, HubResult},
    metrics::{metrics_handler, track_http},
    rate_limit::rate_limit_middleware,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = crate::api::routes()
        .layer(middleware::from_fn_with_state(ctx.clone(), rate_limit_middleware))
        .layer(DefaultBodyLimit::max(ctx.config.service.upload_limit));

    let mut router = Router::new()
        .merge(crate::api::health::routes())
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api);

    // Disk assets are served by this process; remote stores serve their own
    if let AssetStoreConfig::Disk { location, .. } = &ctx.config.assets.store {
        router = router.nest_service("/assets", ServeDir::new(location));
    }

    router
        .with_state(ctx)
        .layer(middleware::from_fn(track_http))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "statusCode": 404,
            "success": false,
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> HubResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("vidhub listening on {}", addr);
    info!("   Public URL: {}", ctx.config.service.public_url);
    info!("   Asset store: {}", ctx.media.store_name());

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HubError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| HubError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
