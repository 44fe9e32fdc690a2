use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, RepositoryError, UserRepository};
use crate::db::models::{NewUser, User, UserChanges};
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn load(conn: &rusqlite::Connection, id: i64) -> Result<User, RepositoryError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or(RepositoryError::NotFound("User not found"))
}

fn email_conflict(err: rusqlite::Error) -> RepositoryError {
    if is_unique_violation(&err) {
        RepositoryError::Conflict("Email already exist".to_string())
    } else {
        err.into()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.name, user.email, user.password_hash, user.role, Utc::now()],
        )
        .map_err(email_conflict)?;

        load(&conn, conn.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        load(&conn, id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let current = load(&conn, id)?;

        if current.is_reserved_admin() {
            let role_changed = changes.role.is_some_and(|r| r != current.role);
            let email_changed = changes
                .email
                .as_deref()
                .is_some_and(|e| !e.eq_ignore_ascii_case(&current.email));
            if role_changed || email_changed {
                return Err(RepositoryError::Protected);
            }
        }

        if changes.is_empty() {
            return Ok(current);
        }

        conn.execute(
            "UPDATE users SET
               name = COALESCE(?2, name),
               email = COALESCE(?3, email),
               password_hash = COALESCE(?4, password_hash),
               role = COALESCE(?5, role)
             WHERE id = ?1",
            params![
                id,
                changes.name,
                changes.email,
                changes.password_hash,
                changes.role
            ],
        )
        .map_err(email_conflict)?;

        load(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let current = load(&conn, id)?;
        if current.is_reserved_admin() {
            return Err(RepositoryError::Protected);
        }

        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("User not found"));
        }
        Ok(())
    }
}
