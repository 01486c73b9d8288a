/// User registration and sessions
use crate::{
    account::{LoginRequest, RegisterRequest, SessionResponse},
    api::response::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    db::models::User,
    error::HubResult,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/me", get(me))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> HubResult<ApiResponse<User>> {
    tracing::info!(username = %req.username, "register: creating account");
    let user = ctx.account_manager.create_account(req).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> HubResult<ApiResponse<SessionResponse>> {
    let (user, session) = ctx
        .account_manager
        .login(&req.identifier, &req.password)
        .await
        .map_err(|e| {
            tracing::warn!(identifier = %req.identifier, "login: rejected");
            e
        })?;

    tracing::info!(user_id = %user.id, "login: session created");
    Ok(ApiResponse::ok(
        SessionResponse {
            user,
            access_token: session.access_token,
            expires_at: session.expires_at,
        },
        "User logged in successfully",
    ))
}

async fn logout(State(ctx): State<AppContext>, auth: AuthContext) -> HubResult<ApiResponse<()>> {
    ctx.account_manager.logout(&auth.session.session_id).await?;
    tracing::info!(user_id = %auth.user_id, "logout: session deleted");
    Ok(ApiResponse::message("User logged out"))
}

async fn me(State(ctx): State<AppContext>, auth: AuthContext) -> HubResult<ApiResponse<User>> {
    let user = ctx.account_manager.get_user(&auth.user_id).await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}
