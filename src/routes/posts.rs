use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::guard::{authorize, Guard, ANY_ROLE};
use crate::auth::{policy, Identity};
use crate::db::models::{NewPost, Post, PostChanges};
use crate::error::{AppError, AppResult};
use crate::extractors::PathParam;
use crate::routes::{optional_text, required_text};
use crate::state::AppState;

// --- Forms ---

/// Multipart body of post create/update. Unknown fields (such as a
/// client-supplied `userId`) are ignored; the owner is always the caller.
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub media: Option<Upload>,
}

#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl PostForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = PostForm::default();

        while let Some(field) = multipart.next_field().await.map_err(invalid_body)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = Some(field.text().await.map_err(invalid_body)?),
                "content" => form.content = Some(field.text().await.map_err(invalid_body)?),
                "media" => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(invalid_body)?;
                    // Browsers send an empty part when no file was chosen.
                    if !data.is_empty() {
                        form.media = Some(Upload {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::read(multipart).await
    }
}

fn invalid_body(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
}

// --- Router ---

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/post", get(list_posts).post(create_post))
        .route(
            "/api/post/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route_layer(from_fn_with_state(
            Guard::new(state.tokens.clone(), ANY_ROLE),
            authorize,
        ))
}

// --- Handlers ---

async fn store_upload(state: &AppState, upload: Option<Upload>) -> AppResult<Option<String>> {
    match upload {
        Some(upload) => {
            let path = state
                .media
                .save(
                    upload.file_name.as_deref(),
                    upload.content_type.as_deref(),
                    &upload.data,
                )
                .await?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

async fn create_post(
    State(state): State<AppState>,
    me: Identity,
    form: PostForm,
) -> AppResult<(StatusCode, Json<Post>)> {
    let title = required_text(form.title, "title")?;
    let content = required_text(form.content, "content")?;

    let media_path = store_upload(&state, form.media).await?;

    let created = state
        .posts
        .create(NewPost {
            title,
            content,
            user_id: me.id,
            media_path: media_path.clone(),
            shared_at: Utc::now(),
        })
        .await;

    match created {
        Ok(post) => {
            tracing::info!(post_id = post.id, user_id = me.id, "post created");
            Ok((StatusCode::CREATED, Json(post)))
        }
        Err(e) => {
            if let Some(path) = media_path {
                state.media.discard(&path).await;
            }
            Err(e.into())
        }
    }
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.posts.list().await?))
}

async fn get_post(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.find_by_id(id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    me: Identity,
    PathParam(id): PathParam<i64>,
    form: PostForm,
) -> AppResult<Json<Post>> {
    let existing = state.posts.find_by_id(id).await?;
    policy::ensure_can_mutate(&me, existing.user_id)?;

    let title = optional_text(form.title, "title")?;
    let content = optional_text(form.content, "content")?;

    // Without a new file the stored media path is kept.
    let new_media = store_upload(&state, form.media).await?;

    let updated = state
        .posts
        .update(
            id,
            PostChanges {
                title,
                content,
                media_path: new_media.clone(),
            },
        )
        .await;

    match updated {
        Ok(post) => {
            if let (Some(_), Some(old)) = (&new_media, &existing.media_path) {
                state.media.discard(old).await;
            }
            tracing::info!(post_id = id, by = me.id, "post updated");
            Ok(Json(post))
        }
        Err(e) => {
            if let Some(path) = new_media {
                state.media.discard(&path).await;
            }
            Err(e.into())
        }
    }
}

async fn delete_post(
    State(state): State<AppState>,
    me: Identity,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<Value>> {
    let existing = state.posts.find_by_id(id).await?;
    policy::ensure_can_mutate(&me, existing.user_id)?;

    state.posts.delete(id).await?;
    if let Some(path) = &existing.media_path {
        state.media.discard(path).await;
    }

    tracing::info!(post_id = id, by = me.id, "post deleted");
    Ok(Json(json!({ "message": "Post deleted" })))
}
