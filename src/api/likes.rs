/// Like endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams},
        response::ApiResponse,
    },
    auth::AuthContext,
    context::AppContext,
    db::models::{Like, Video},
    error::HubResult,
    pagination::ListQuery,
    relations::{likes::LIKED_VIDEOS, ToggleOutcome},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};

/// Build like routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/likes/toggle/v/:video_id", post(toggle_video_like))
        .route("/likes/toggle/c/:comment_id", post(toggle_comment_like))
        .route("/likes/toggle/t/:tweet_id", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

fn toggle_response(outcome: ToggleOutcome<Like>) -> ApiResponse<ToggleOutcome<Like>> {
    match outcome {
        ToggleOutcome::Created(_) => ApiResponse::ok(outcome, "Liked"),
        ToggleOutcome::Removed => ApiResponse::ok(outcome, "Like removed"),
        ToggleOutcome::Unsupported => ApiResponse::with_status(
            StatusCode::NOT_IMPLEMENTED,
            Some(outcome),
            "Liking tweets is not supported yet",
        ),
    }
}

async fn toggle_video_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> HubResult<ApiResponse<ToggleOutcome<Like>>> {
    let video_id = path_id(&video_id, "video")?;
    let outcome = ctx.likes.toggle_video_like(&auth.user_id, &video_id).await?;
    Ok(toggle_response(outcome))
}

async fn toggle_comment_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
) -> HubResult<ApiResponse<ToggleOutcome<Like>>> {
    let comment_id = path_id(&comment_id, "comment")?;
    let outcome = ctx
        .likes
        .toggle_comment_like(&auth.user_id, &comment_id)
        .await?;
    Ok(toggle_response(outcome))
}

async fn toggle_tweet_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
) -> HubResult<ApiResponse<ToggleOutcome<Like>>> {
    let tweet_id = path_id(&tweet_id, "tweet")?;
    let outcome = ctx.likes.toggle_tweet_like(&auth.user_id, &tweet_id).await?;
    Ok(toggle_response(outcome))
}

async fn liked_videos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<Video>>> {
    let (sort, page) = params.resolve(&LIKED_VIDEOS, &ctx.config.pagination)?;
    let result = ctx
        .likes
        .liked_videos(&auth.user_id, ListQuery::new(sort, page))
        .await?;
    Ok(ApiResponse::page(result, "Liked videos fetched successfully"))
}
