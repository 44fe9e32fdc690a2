// Repository pattern - isolates all database side effects
pub mod posts;
pub mod users;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::{NewPost, NewUser, Post, PostChanges, User, UserChanges};

pub use posts::SqlitePostRepository;
pub use users::SqliteUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Reserved admin account cannot be modified")]
    Protected,
}

/// Credential store operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Fails with `NotFound` when the id is absent.
    async fn find_by_id(&self, id: i64) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// All users, ordered by id ascending.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Merge `changes` into the stored record. Refuses to change the role or
    /// email of the reserved admin.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, RepositoryError>;

    /// Refuses to delete the reserved admin.
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Post, RepositoryError>;

    /// All posts, newest share time first.
    async fn list(&self) -> Result<Vec<Post>, RepositoryError>;

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// Stored media of every post owned by `user_id`.
    async fn media_paths_for_user(&self, user_id: i64) -> Result<Vec<String>, RepositoryError>;
}

fn extended_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    extended_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    extended_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}
