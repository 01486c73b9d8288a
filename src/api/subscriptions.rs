/// Subscription endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams},
        response::ApiResponse,
    },
    auth::AuthContext,
    context::AppContext,
    db::models::{Subscription, UserProfile},
    error::HubResult,
    pagination::ListQuery,
    relations::{
        subscriptions::{CHANNELS, SUBSCRIBERS},
        ToggleOutcome,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};

/// Build subscription routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/subscriptions/c/:channel_id",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/:subscriber_id", get(subscribed_channels))
}

async fn toggle_subscription(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(channel_id): Path<String>,
) -> HubResult<ApiResponse<ToggleOutcome<Subscription>>> {
    let channel_id = path_id(&channel_id, "channel")?;
    let outcome = ctx.subscriptions.toggle(&auth.user_id, &channel_id).await?;

    let message = match outcome {
        ToggleOutcome::Removed => "Unsubscribed",
        _ => "Subscribed",
    };
    tracing::debug!(subscriber_id = %auth.user_id, channel_id = %channel_id, state = outcome.label(), "subscription toggled");
    Ok(ApiResponse::ok(outcome, message))
}

async fn channel_subscribers(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<String>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<UserProfile>>> {
    let channel_id = path_id(&channel_id, "channel")?;
    let (sort, page) = params.resolve(&SUBSCRIBERS, &ctx.config.pagination)?;
    let result = ctx
        .subscriptions
        .subscribers_of(&channel_id, ListQuery::new(sort, page))
        .await?;
    Ok(ApiResponse::page(result, "Subscribers fetched successfully"))
}

async fn subscribed_channels(
    State(ctx): State<AppContext>,
    Path(subscriber_id): Path<String>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<UserProfile>>> {
    let subscriber_id = path_id(&subscriber_id, "subscriber")?;
    let (sort, page) = params.resolve(&CHANNELS, &ctx.config.pagination)?;
    let result = ctx
        .subscriptions
        .channels_of(&subscriber_id, ListQuery::new(sort, page))
        .await?;
    Ok(ApiResponse::page(result, "Subscribed channels fetched successfully"))
}
