/// API routes and handlers
pub mod accounts;
pub mod comments;
pub mod health;
pub mod likes;
pub mod middleware;
pub mod playlists;
pub mod response;
pub mod subscriptions;
pub mod tweets;
pub mod videos;

use crate::context::AppContext;
use axum::Router;

/// Build API routes, mounted under `/api/v1`
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(accounts::routes())
        .merge(videos::routes())
        .merge(comments::routes())
        .merge(tweets::routes())
        .merge(playlists::routes())
        .merge(likes::routes())
        .merge(subscriptions::routes())
}
