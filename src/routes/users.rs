use axum::extract::State;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::guard::{authorize, Guard, ADMIN_ONLY, ANY_ROLE};
use crate::auth::password::hash_password;
use crate::auth::{policy, Identity};
use crate::db::models::{NewUser, Role, User, UserChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::{JsonBody, PathParam};
use crate::routes::{normalize_email, optional_text, required_text};
use crate::state::AppState;

// --- Request types ---

/// Body of `POST /api/auth/register` and `POST /api/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

// --- Router ---

pub fn router(state: &AppState) -> Router<AppState> {
    let any = from_fn_with_state(Guard::new(state.tokens.clone(), ANY_ROLE), authorize);
    let admin = from_fn_with_state(Guard::new(state.tokens.clone(), ADMIN_ONLY), authorize);

    Router::new()
        .route(
            "/api/users",
            get(list_users)
                .post(create_user)
                .route_layer(admin.clone()),
        )
        .route("/api/users/profile", get(profile).route_layer(any.clone()))
        .route(
            "/api/users/{id}",
            get(get_user)
                .put(update_user)
                .route_layer(any)
                .delete(delete_user.layer(admin)),
        )
}

// --- Shared with registration ---

/// Validate a create request, hash its password and check the email is free.
pub(crate) async fn create_account(state: &AppState, req: CreateUserRequest) -> AppResult<User> {
    let name = required_text(req.name, "name")?;
    let email = normalize_email(required_text(req.email, "email")?)?;
    let password = required_text(req.password, "password")?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already exist".into()));
    }

    let password_hash = hash_password(&password, state.config.auth.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role: req.role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "account created");
    Ok(user)
}

// --- Handlers ---

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = create_account(&state, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's own record.
async fn profile(State(state): State<AppState>, me: Identity) -> AppResult<Json<User>> {
    Ok(Json(state.users.find_by_id(me.id).await?))
}

async fn get_user(
    State(state): State<AppState>,
    me: Identity,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<User>> {
    policy::ensure_can_mutate(&me, id)?;
    Ok(Json(state.users.find_by_id(id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    me: Identity,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    policy::ensure_can_mutate(&me, id)?;
    let current = state.users.find_by_id(id).await?;

    let email = optional_text(req.email, "email")?
        .map(normalize_email)
        .transpose()?;
    policy::ensure_role_change_allowed(&me, current.role, req.role)?;
    policy::ensure_reserved_fields_unchanged(&current, email.as_deref(), req.role)?;

    // Edit forms send `password: ""` when the password is left alone.
    let password_hash = req
        .password
        .filter(|p| !p.trim().is_empty())
        .map(|p| hash_password(&p, state.config.auth.bcrypt_cost))
        .transpose()?;

    let changes = UserChanges {
        name: optional_text(req.name, "name")?,
        email,
        password_hash,
        role: req.role,
    };

    let user = state.users.update(id, changes).await?;
    tracing::info!(user_id = user.id, by = me.id, "user updated");
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    me: Identity,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<Value>> {
    let target = state.users.find_by_id(id).await?;
    policy::ensure_not_reserved(&target)?;

    // Posts go with their owner; collect their media before the rows vanish.
    let media = state.posts.media_paths_for_user(id).await?;

    state.users.delete(id).await?;
    for path in &media {
        state.media.discard(path).await;
    }

    tracing::info!(user_id = id, by = me.id, "user deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}
