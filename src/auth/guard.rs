use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::token::{TokenError, TokenService};
use crate::auth::Identity;
use crate::db::models::Role;
use crate::error::AppError;

/// Any authenticated identity.
pub const ANY_ROLE: &[Role] = &[];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Route guard state: the token verifier plus the roles a route admits.
/// An empty role list admits every authenticated caller.
#[derive(Clone)]
pub struct Guard {
    tokens: Arc<TokenService>,
    required: &'static [Role],
}

impl Guard {
    pub fn new(tokens: Arc<TokenService>, required: &'static [Role]) -> Self {
        Self { tokens, required }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<Identity, AppError> {
        let token = extract_bearer(headers)
            .ok_or_else(|| AppError::Unauthenticated("No token provided".into()))?;

        let claims = self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => AppError::SessionExpired,
            _ => AppError::Unauthenticated("Invalid token".into()),
        })?;

        if !self.required.is_empty() && !self.required.contains(&claims.role) {
            tracing::debug!(
                user_id = claims.subject_id,
                role = %claims.role,
                "role not permitted on route"
            );
            return Err(AppError::Forbidden);
        }

        Ok(Identity {
            id: claims.subject_id,
            role: claims.role,
        })
    }
}

/// Middleware that admits a request only with a valid bearer token whose role
/// is allowed, and attaches the caller's `Identity` for handlers.
pub async fn authorize(
    State(guard): State<Guard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = guard.check(req.headers())?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
