use common_types::UnknownBackend;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    UnknownBackend(#[from] UnknownBackend),

    #[error("OPENAI_API_KEY is required when using the openai backend")]
    MissingApiKey,

    #[error("quality threshold must be between 0 and 10, got {0}")]
    InvalidThreshold(f32),

    #[error("{0} must be at least 1")]
    ZeroValue(&'static str),

    #[error("WebDAV source selected but no WebDAV URL is configured (set WEBDAV_URL)")]
    MissingWebDavUrl,

    #[error("watch mode only works with a local folder, not WebDAV")]
    WatchRequiresLocalFolder,
}
