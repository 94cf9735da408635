mod local;
mod webdav;

pub use local::{LocalFolderSource, read_image_file};
pub use webdav::WebDavSource;

use async_trait::async_trait;
use common_types::ImageRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions picked up when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WebDAV URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("WebDAV request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDAV server rejected the credentials for {0}")]
    Unauthorized(String),

    #[error("WebDAV server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed WebDAV response: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Somewhere images can be listed and read from.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Human readable location, safe to log (no credentials).
    fn describe(&self) -> String;

    /// Reads supported images in listing order, stopping after `max_count` if given.
    /// Files that cannot be read are skipped.
    async fn list_images(&self, max_count: Option<usize>) -> Result<Vec<ImageRecord>, SourceError>;
}

#[must_use]
pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect()
}

/// Case-insensitive extension check against `extensions` (given without dots).
#[must_use]
pub fn has_supported_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
