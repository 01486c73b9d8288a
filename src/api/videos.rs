/// Video endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams, MultipartForm},
        response::ApiResponse,
    },
    auth::AuthContext,
    content::{videos::VIDEOS, VideoFilters, VideoUpdate},
    context::AppContext,
    db::{self, models::Video},
    error::{HubError, HubResult},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, patch},
    Router,
};
use serde::Serialize;

/// Build video routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/videos", get(list_videos).post(publish_video))
        .route(
            "/videos/:video_id",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/toggle/publish/:video_id", patch(toggle_publish))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletedVideo {
    id: String,
    retirement_failures: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishState {
    id: String,
    is_published: bool,
}

async fn list_videos(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<Video>>> {
    let (sort, page) = params.resolve(&VIDEOS, &ctx.config.pagination)?;
    let user_id = params
        .user_id
        .as_deref()
        .map(|raw| db::parse_id(raw, "user"))
        .transpose()?;

    let filters = VideoFilters {
        query: params.query.clone(),
        user_id,
    };
    let result = ctx.videos.list(filters, sort, page).await?;
    Ok(ApiResponse::page(result, "Videos fetched successfully"))
}

async fn publish_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> HubResult<ApiResponse<Video>> {
    let mut form = MultipartForm::read(multipart, &ctx.config.storage.temp_directory).await?;

    let video_file = form
        .take_file("video")
        .ok_or_else(|| HubError::Validation("video file is required".to_string()))?;
    let thumbnail = form.take_file("thumbnail");
    let title = form.text("title").unwrap_or_default().to_string();

    let video = ctx
        .videos
        .publish(
            &auth.user_id,
            &title,
            form.text("description"),
            video_file,
            thumbnail,
        )
        .await?;

    tracing::info!(video_id = %video.id, user_id = %auth.user_id, "publish_video: done");
    Ok(ApiResponse::created(video, "Video published successfully"))
}

async fn get_video(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
) -> HubResult<ApiResponse<Video>> {
    let video_id = path_id(&video_id, "video")?;
    let video = ctx.videos.get_by_id(&video_id).await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

async fn update_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> HubResult<ApiResponse<Video>> {
    let video_id = path_id(&video_id, "video")?;
    let mut form = MultipartForm::read(multipart, &ctx.config.storage.temp_directory).await?;

    let changes = VideoUpdate {
        title: form.text("title").map(str::to_string),
        description: form.text("description").map(str::to_string),
        video_file: form.take_file("video"),
        thumbnail: form.take_file("thumbnail"),
    };

    let video = ctx.videos.update(&auth.user_id, &video_id, changes).await?;
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

async fn delete_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> HubResult<ApiResponse<DeletedVideo>> {
    let video_id = path_id(&video_id, "video")?;
    let report = ctx.videos.delete(&auth.user_id, &video_id).await?;

    Ok(ApiResponse::ok(
        DeletedVideo {
            id: report.video.id,
            retirement_failures: report.retirement_failures,
        },
        "Video deleted successfully",
    ))
}

async fn toggle_publish(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> HubResult<ApiResponse<PublishState>> {
    let video_id = path_id(&video_id, "video")?;
    let video = ctx.videos.toggle_publish(&auth.user_id, &video_id).await?;

    Ok(ApiResponse::ok(
        PublishState {
            id: video.id,
            is_published: video.is_published,
        },
        "Publish state toggled",
    ))
}
