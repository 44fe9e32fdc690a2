use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::password::hash_password;
use crate::auth::token::TokenService;
use crate::config::Config;
use crate::db;
use crate::db::models::{NewUser, Role, RESERVED_ADMIN_EMAIL};
use crate::media::{MediaStore, UPLOADS_PREFIX};
use crate::repository::{SqlitePostRepository, SqliteUserRepository};
use crate::routes;
use crate::state::AppState;

/// Open the database, apply migrations and assemble the shared handles.
/// Fails when required configuration is missing.
pub fn build_state(config: Config) -> anyhow::Result<AppState> {
    config.validate()?;
    let secret = config
        .jwt_secret()
        .context("auth.jwt_secret is required")?
        .to_string();

    std::fs::create_dir_all(config.uploads_path())?;

    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    Ok(AppState {
        users: Arc::new(SqliteUserRepository::new(pool.clone())),
        posts: Arc::new(SqlitePostRepository::new(pool)),
        tokens: Arc::new(TokenService::new(secret.as_bytes())),
        media: MediaStore::new(config.uploads_path()),
        config,
    })
}

/// Create the reserved admin account if it does not exist yet.
pub async fn ensure_reserved_admin(state: &AppState) -> anyhow::Result<()> {
    if state.users.find_by_email(RESERVED_ADMIN_EMAIL).await?.is_some() {
        return Ok(());
    }

    let password = state
        .config
        .admin
        .password
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .with_context(|| {
            format!(
                "reserved admin {RESERVED_ADMIN_EMAIL} does not exist; \
                 set admin.password, --admin-password or WIT_ADMIN_PASSWORD to create it"
            )
        })?;

    let admin = state
        .users
        .create(NewUser {
            name: state.config.admin.name.clone(),
            email: RESERVED_ADMIN_EMAIL.to_string(),
            password_hash: hash_password(password, state.config.auth.bcrypt_cost)?,
            role: Role::Admin,
        })
        .await?;

    tracing::info!(user_id = admin.id, "Created reserved admin {}", RESERVED_ADMIN_EMAIL);
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let mut app = routes::router(&state)
        .nest_service(
            &format!("/{UPLOADS_PREFIX}"),
            ServeDir::new(state.media.root()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes())),
        );

    if let Some(cors) = cors_layer(&state.config.server.cors_origins) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

/// Everything `main` needs: state, bootstrap admin, router.
pub async fn build(config: Config) -> anyhow::Result<Router> {
    let state = build_state(config)?;
    ensure_reserved_admin(&state).await?;
    Ok(router(state))
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
