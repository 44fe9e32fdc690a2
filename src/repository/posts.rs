use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use super::{is_foreign_key_violation, PostRepository, RepositoryError};
use crate::db::models::{Author, NewPost, Post, PostChanges};
use crate::state::DbPool;

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.user_id, p.media_path, p.shared_at,
            u.id, u.name, u.email
     FROM posts p
     JOIN users u ON u.id = p.user_id";

pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        user_id: row.get(3)?,
        media_path: row.get(4)?,
        shared_at: row.get(5)?,
        author: Author {
            id: row.get(6)?,
            name: row.get(7)?,
            email: row.get(8)?,
        },
    })
}

fn load(conn: &rusqlite::Connection, id: i64) -> Result<Post, RepositoryError> {
    conn.query_row(
        &format!("{POST_SELECT} WHERE p.id = ?1"),
        params![id],
        post_from_row,
    )
    .optional()?
    .ok_or(RepositoryError::NotFound("Post not found"))
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO posts (title, content, user_id, media_path, shared_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.title,
                post.content,
                post.user_id,
                post.media_path,
                post.shared_at
            ],
        )
        .map_err(|e| {
            // The owner was deleted after its token was issued.
            if is_foreign_key_violation(&e) {
                RepositoryError::NotFound("User not found")
            } else {
                e.into()
            }
        })?;

        load(&conn, conn.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        load(&conn, id)
    }

    async fn list(&self) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{POST_SELECT} ORDER BY p.shared_at DESC, p.id DESC"
        ))?;
        let posts = stmt
            .query_map([], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE posts SET
               title = COALESCE(?2, title),
               content = COALESCE(?3, content),
               media_path = COALESCE(?4, media_path)
             WHERE id = ?1",
            params![id, changes.title, changes.content, changes.media_path],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("Post not found"));
        }

        load(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("Post not found"));
        }
        Ok(())
    }

    async fn media_paths_for_user(&self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT media_path FROM posts WHERE user_id = ?1 AND media_path IS NOT NULL",
        )?;
        let paths = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }
}
