//! File-storage collaborator: accepts an upload and returns a stable URL

use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One uploaded file, fully buffered
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: Option<String>,
    pub content_type: Option<mime::Mime>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn classify(content_type: &mime::Mime) -> Option<Self> {
        let top = content_type.type_();
        if top == mime::IMAGE {
            Some(MediaKind::Image)
        } else if top == mime::VIDEO {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    fn dir(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist the upload and return its public URL
    async fn store(&self, upload: MediaUpload) -> Result<String>;

    /// Delete a file previously returned by `store`; a missing file is not an error
    async fn remove(&self, url: &str) -> Result<()>;
}

/// Best-effort removal of an upload whose owning row was never written
pub(crate) async fn discard(media: &dyn MediaStore, url: &str) {
    if let Err(e) = media.remove(url).await {
        tracing::warn!(url = %url, "failed to remove orphaned upload: {}", e);
    }
}

/// Writes uploads under `<upload_dir>/images` or `<upload_dir>/videos`
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.upload_dir, config.public_prefix.clone())
    }

    /// Map a public URL back to its file; only `<images|videos>/<file>` resolves
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.public_prefix)?.strip_prefix('/')?;
        let (dir, file) = relative.split_once('/')?;
        let known_dir = [MediaKind::Image, MediaKind::Video]
            .iter()
            .any(|kind| kind.dir() == dir);
        let plain_file = !file.is_empty()
            && !file.starts_with('.')
            && !file.contains(['/', '\\']);

        (known_dir && plain_file).then(|| self.root.join(dir).join(file))
    }
}

/// Extension of the client's filename, falling back to the MIME subtype
fn extension_for(upload: &MediaUpload, content_type: &mime::Mime) -> String {
    let from_name = upload
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match from_name {
        Some(ext) => format!(".{}", ext.to_lowercase()),
        None => format!(".{}", content_type.subtype().as_str()),
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<String> {
        let content_type = upload
            .content_type
            .clone()
            .ok_or_else(|| AppError::validation("Upload is missing a content type"))?;
        let kind = MediaKind::classify(&content_type)
            .ok_or_else(|| AppError::validation("Only image and video uploads are supported"))?;

        let file_name = format!(
            "{}-{}{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension_for(&upload, &content_type)
        );
        let dir = self.root.join(kind.dir());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("create {}: {}", dir.display(), e)))?;
        tokio::fs::write(dir.join(&file_name), &upload.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", file_name, e)))?;

        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "stored media upload");
        Ok(format!("{}/{}/{}", self.public_prefix, kind.dir(), file_name))
    }

    async fn remove(&self, url: &str) -> Result<()> {
        let path = self
            .path_for(url)
            .ok_or_else(|| AppError::Storage(format!("not a stored media url: {}", url)))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed media upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("remove {}: {}", path.display(), e))),
        }
    }
}
