pub mod auth;
pub mod posts;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router(state))
        .merge(users::router(state))
        .merge(posts::router(state))
}

async fn health() -> &'static str {
    "ok"
}

/// A field that must be present and not blank. Returned trimmed.
pub(crate) fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// A field that may be omitted, but not sent blank.
pub(crate) fn optional_text(value: Option<String>, field: &str) -> AppResult<Option<String>> {
    value.map(|v| required_text(Some(v), field)).transpose()
}

pub(crate) fn normalize_email(email: String) -> AppResult<String> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("email is invalid".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text(Some("  hi ".into()), "title").unwrap(), "hi");
        assert!(matches!(
            required_text(Some("   ".into()), "title"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            required_text(None, "title"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn optional_text_allows_absence_only() {
        assert_eq!(optional_text(None, "name").unwrap(), None);
        assert_eq!(
            optional_text(Some("Ana".into()), "name").unwrap(),
            Some("Ana".to_string())
        );
        assert!(optional_text(Some("".into()), "name").is_err());
    }

    #[test]
    fn normalize_email_lowercases_and_checks_shape() {
        assert_eq!(
            normalize_email(" Ana@Example.COM ".into()).unwrap(),
            "ana@example.com"
        );
        assert!(normalize_email("no-at-sign".into()).is_err());
        assert!(normalize_email("@example.com".into()).is_err());
        assert!(normalize_email("ana@".into()).is_err());
    }
}
