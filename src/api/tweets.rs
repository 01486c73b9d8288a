/// Tweet endpoints
use crate::{
    api::{
        middleware::{path_id, ListParams},
        response::ApiResponse,
    },
    auth::AuthContext,
    content::tweets::TWEETS,
    context::AppContext,
    db::models::Tweet,
    error::HubResult,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

/// Build tweet routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/:user_id", get(list_user_tweets))
        .route("/tweets/:tweet_id", patch(update_tweet).delete(delete_tweet))
}

#[derive(Debug, Deserialize)]
pub struct TweetBody {
    pub content: String,
}

async fn create_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(body): Json<TweetBody>,
) -> HubResult<ApiResponse<Tweet>> {
    let tweet = ctx.tweets.create(&auth.user_id, &body.content).await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

async fn list_user_tweets(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> HubResult<ApiResponse<Vec<Tweet>>> {
    let user_id = path_id(&user_id, "user")?;
    let (sort, page) = params.resolve(&TWEETS, &ctx.config.pagination)?;
    let result = ctx.tweets.list_for_user(&user_id, sort, page).await?;
    Ok(ApiResponse::page(result, "Tweets fetched successfully"))
}

async fn update_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
    Json(body): Json<TweetBody>,
) -> HubResult<ApiResponse<Tweet>> {
    let tweet_id = path_id(&tweet_id, "tweet")?;
    let tweet = ctx
        .tweets
        .update(&auth.user_id, &tweet_id, &body.content)
        .await?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

async fn delete_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
) -> HubResult<ApiResponse<Tweet>> {
    let tweet_id = path_id(&tweet_id, "tweet")?;
    let tweet = ctx.tweets.delete(&auth.user_id, &tweet_id).await?;
    Ok(ApiResponse::ok(tweet, "Tweet deleted successfully"))
}
