use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// URL prefix under which stored media is served, and the prefix of every
/// stored `mediaPath`.
pub const UPLOADS_PREFIX: &str = "uploads";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid media path: {0}")]
    InvalidPath(String),
}

/// Uploaded media files on local disk.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a fresh name and return its `mediaPath`.
    pub async fn save(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, MediaError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let stored = format!(
            "{}{}",
            uuid::Uuid::now_v7(),
            extension_for(file_name, content_type)
        );
        tokio::fs::write(self.root.join(&stored), data).await?;

        tracing::debug!(file = %stored, bytes = data.len(), "stored upload");
        Ok(format!("{UPLOADS_PREFIX}/{stored}"))
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn remove(&self, media_path: &str) -> Result<(), MediaError> {
        let path = self.resolve(media_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal used when a post's media is replaced or the post is
    /// deleted; failures are logged only.
    pub async fn discard(&self, media_path: &str) {
        if let Err(e) = self.remove(media_path).await {
            tracing::warn!(media_path, "failed to remove media: {}", e);
        }
    }

    /// Map a `mediaPath` to a file inside the root, refusing anything that
    /// would escape it.
    fn resolve(&self, media_path: &str) -> Result<PathBuf, MediaError> {
        let relative = media_path
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| MediaError::InvalidPath(media_path.to_string()))?;

        let mut components = Path::new(relative).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(MediaError::InvalidPath(media_path.to_string())),
        }
    }
}

/// Extension (with the dot) for a stored file: the client's own extension if
/// it is short and alphanumeric, else one guessed from the content type.
fn extension_for(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    let ext = from_name.or_else(|| {
        content_type
            .and_then(mime_guess::get_mime_extensions_str)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
    });

    ext.map(|e| format!(".{e}")).unwrap_or_default()
}
