/// Comment endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams},
        response::ApiResponse,
    },
    auth::AuthContext,
    content::comments::COMMENTS,
    context::AppContext,
    db::models::Comment,
    error::HubResult,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

/// Build comment routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/comments/:video_id", get(list_comments).post(add_comment))
        .route(
            "/comments/c/:comment_id",
            patch(update_comment).delete(delete_comment),
        )
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

async fn list_comments(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<Comment>>> {
    let video_id = path_id(&video_id, "video")?;
    let (sort, page) = params.resolve(&COMMENTS, &ctx.config.pagination)?;
    let result = ctx.comments.list_for_video(&video_id, sort, page).await?;
    Ok(ApiResponse::page(result, "Comments fetched successfully"))
}

async fn add_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> HubResult<ApiResponse<Comment>> {
    let video_id = path_id(&video_id, "video")?;
    let comment = ctx
        .comments
        .add(&auth.user_id, &video_id, &body.content)
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

async fn update_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> HubResult<ApiResponse<Comment>> {
    let comment_id = path_id(&comment_id, "comment")?;
    let comment = ctx
        .comments
        .update(&auth.user_id, &comment_id, &body.content)
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
) -> HubResult<ApiResponse<Comment>> {
    let comment_id = path_id(&comment_id, "comment")?;
    let comment = ctx.comments.delete(&auth.user_id, &comment_id).await?;
    Ok(ApiResponse::ok(comment, "Comment deleted successfully"))
}
