//! Authentication handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::auth::AuthTokens;
use crate::services::AuthService;
use crate::AppState;
use shared::models::User;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthTokens>> {
    body.validate()?;
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(body.username.trim(), &body.password).await?;
    Ok(Json(tokens))
}

/// Self-service registration is switched off; accounts come from an administrator
pub async fn register() -> AppResult<Json<MessageResponse>> {
    Err(AppError::Forbidden(
        "Registration is disabled. Please contact the administrator for an account".to_string(),
    ))
}

/// Tokens are stateless, so logging out only needs the client to drop its token
pub async fn logout(current_user: CurrentUser) -> Json<MessageResponse> {
    tracing::info!("User {} logged out", current_user.0.username);
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}

/// Current account
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}
