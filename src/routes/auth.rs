use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::guard::{authorize, Guard, ADMIN_ONLY};
use crate::auth::password::verify_password;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::routes::users::{create_account, CreateUserRequest};
use crate::routes::{normalize_email, required_text};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// Registration takes the same body as admin user creation.
pub type RegisterRequest = CreateUserRequest;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: User,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let admin = from_fn_with_state(Guard::new(state.tokens.clone(), ADMIN_ONLY), authorize);

    Router::new()
        .route("/api/auth/register", post(register).route_layer(admin))
        .route("/api/auth/login", post(login))
}

/// POST /api/auth/register: admins create accounts
async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = create_account(&state, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Done",
            user,
        }),
    ))
}

/// POST /api/auth/login: exchange email and password for an access token
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = normalize_email(required_text(req.email, "email")?)?;
    let password = required_text(req.password, "password")?;

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    if !verify_password(&password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::Unauthenticated("Wrong Password".into()));
    }

    let token = state.tokens.issue(user.id, user.role)?;
    tracing::info!(user_id = user.id, "login successful");

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
    }))
}
