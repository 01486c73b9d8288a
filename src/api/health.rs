/// Health check endpoints
///
/// Liveness answers as long as the process does. Readiness requires the
/// database. The detailed report adds the asset store's retirement
/// backlog; the store itself is not contacted.

use crate::{context::AppContext, error::HubResult};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_check))
        .route("/health/detailed", get(health_detailed))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check: 503 until the database answers
pub async fn readiness_check(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness_check_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let checks = vec![
        check_database_detailed(&ctx).await,
        check_retirement_backlog(&ctx).await,
    ];
    let overall_status = determine_overall_status(&checks);

    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let health = HealthStatus {
        message: (overall_status != "healthy")
            .then(|| "One or more components are not healthy".to_string()),
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    };

    (status_code, Json(health))
}

async fn check_database(ctx: &AppContext) -> HubResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

async fn check_database_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();

    match check_database(ctx).await {
        Ok(_) => ComponentHealth {
            name: "database".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({
                "type": "sqlite",
                "pool_size": ctx.db.size(),
            })),
        },
        Err(e) => ComponentHealth {
            name: "database".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

/// Queued retirements mean remote assets are still billed; degraded, not down
async fn check_retirement_backlog(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let backend = ctx.media.store_name();

    match ctx.media.retirements().len().await {
        Ok(pending) => ComponentHealth {
            name: "asset_store".to_string(),
            status: if pending == 0 { "healthy" } else { "degraded" }.to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({
                "backend": backend,
                "pending_retirements": pending,
            })),
        },
        Err(e) => ComponentHealth {
            name: "asset_store".to_string(),
            status: "degraded".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: Some(serde_json::json!({ "backend": backend })),
        },
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy".to_string()
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: &str) -> ComponentHealth {
        ComponentHealth {
            name: "c".to_string(),
            status: status.to_string(),
            response_time_ms: Some(1),
            error: None,
            details: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(
            determine_overall_status(&[component("healthy"), component("healthy")]),
            "healthy"
        );
        assert_eq!(
            determine_overall_status(&[component("healthy"), component("degraded")]),
            "degraded"
        );
        assert_eq!(
            determine_overall_status(&[component("unhealthy"), component("degraded")]),
            "unhealthy"
        );
    }
}
