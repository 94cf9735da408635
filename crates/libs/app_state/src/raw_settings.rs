use common_types::OutOfRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings as read from `config/settings.yaml` and the environment, before conversion.
/// Every field has a default, so an empty or missing file is valid.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawSettings {
    pub api: RawApiSettings,
    pub evaluation: RawEvaluationSettings,
    pub source: RawSourceSettings,
    pub output: OutputSettings,
    pub watch: RawWatchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawApiSettings {
    /// `openai` or `ollama`, case-insensitive.
    pub default_backend: String,
    pub openai: OpenAiSettings,
    pub ollama: OllamaSettings,
}

impl Default for RawApiSettings {
    fn default() -> Self {
        Self {
            default_backend: "openai".to_string(),
            openai: OpenAiSettings::default(),
            ollama: OllamaSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OllamaSettings {
    pub host: String,
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawEvaluationSettings {
    pub threshold: f32,
    pub workers: usize,
    pub batch_size: usize,
    /// Longest image side in pixels before upload, 0 to disable resizing.
    pub resize_max: u32,
    pub max_images: Option<usize>,
    pub retry_failed: bool,
    pub request_timeout_secs: u64,
    pub request_delay_ms: u64,
    /// `clamp` or `reject` scores outside 1 to 10.
    pub out_of_range: OutOfRange,
}

impl Default for RawEvaluationSettings {
    fn default() -> Self {
        Self {
            threshold: 7.5,
            workers: 4,
            batch_size: 10,
            resize_max: 1024,
            max_images: None,
            retry_failed: false,
            request_timeout_secs: 120,
            request_delay_ms: 0,
            out_of_range: OutOfRange::Clamp,
        }
    }
}

/// Where images are read from.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Local,
    WebDav,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawSourceSettings {
    pub mode: SourceMode,
    pub image_folder: PathBuf,
    /// Supported file extensions, without dots.
    pub extensions: Vec<String>,
    pub webdav: WebDavSettings,
}

impl Default for RawSourceSettings {
    fn default() -> Self {
        Self {
            mode: SourceMode::Local,
            image_folder: PathBuf::from("./data/images"),
            extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp"]
                .map(String::from)
                .to_vec(),
            webdav: WebDavSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WebDavSettings {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Remote folder below `url` to list.
    pub root: String,
    pub verify_ssl: bool,
}

impl Default for WebDavSettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            root: "/".to_string(),
            verify_ssl: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    /// Each run writes a `run_<timestamp>` folder in here.
    pub result_folder: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            result_folder: PathBuf::from("./data/results"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RawWatchSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RawWatchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    /// Fallback filter when `RUST_LOG` is not set.
    pub level: String,
    /// Also write logs to this file, without colors.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
