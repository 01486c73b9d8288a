/// Playlist endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams},
        response::ApiResponse,
    },
    auth::AuthContext,
    content::playlists::PLAYLISTS,
    context::AppContext,
    db::models::{Playlist, PlaylistWithVideos},
    error::HubResult,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

/// Build playlist routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/playlist", post(create_playlist))
        .route(
            "/playlist/:playlist_id",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlist/add/:video_id/:playlist_id", patch(add_video))
        .route("/playlist/remove/:video_id/:playlist_id", patch(remove_video))
        .route("/playlist/user/:user_id", get(list_user_playlists))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn create_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(body): Json<CreatePlaylistBody>,
) -> HubResult<ApiResponse<Playlist>> {
    let playlist = ctx
        .playlists
        .create(&auth.user_id, &body.name, body.description.as_deref())
        .await?;
    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

async fn get_playlist(
    State(ctx): State<AppContext>,
    Path(playlist_id): Path<String>,
) -> HubResult<ApiResponse<PlaylistWithVideos>> {
    let playlist_id = path_id(&playlist_id, "playlist")?;
    let playlist = ctx.playlists.get_by_id(&playlist_id).await?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

async fn update_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(playlist_id): Path<String>,
    Json(body): Json<UpdatePlaylistBody>,
) -> HubResult<ApiResponse<PlaylistWithVideos>> {
    let playlist_id = path_id(&playlist_id, "playlist")?;
    let playlist = ctx
        .playlists
        .update(
            &auth.user_id,
            &playlist_id,
            body.name.as_deref(),
            body.description.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

async fn delete_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(playlist_id): Path<String>,
) -> HubResult<ApiResponse<Playlist>> {
    let playlist_id = path_id(&playlist_id, "playlist")?;
    let playlist = ctx.playlists.delete(&auth.user_id, &playlist_id).await?;
    Ok(ApiResponse::ok(playlist, "Playlist deleted successfully"))
}

async fn add_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> HubResult<ApiResponse<PlaylistWithVideos>> {
    let video_id = path_id(&video_id, "video")?;
    let playlist_id = path_id(&playlist_id, "playlist")?;
    let playlist = ctx
        .playlists
        .add_video(&auth.user_id, &playlist_id, &video_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist"))
}

async fn remove_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> HubResult<ApiResponse<PlaylistWithVideos>> {
    let video_id = path_id(&video_id, "video")?;
    let playlist_id = path_id(&playlist_id, "playlist")?;
    let playlist = ctx
        .playlists
        .remove_video(&auth.user_id, &playlist_id, &video_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Video removed from playlist"))
}

async fn list_user_playlists(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<Playlist>>> {
    let user_id = path_id(&user_id, "user")?;
    let (sort, page) = params.resolve(&PLAYLISTS, &ctx.config.pagination)?;
    let result = ctx.playlists.list_for_user(&user_id, sort, page).await?;
    Ok(ApiResponse::page(result, "Playlists fetched successfully"))
}
