use crate::{
    LoggingSettings, OllamaSettings, OpenAiSettings, OutputSettings, RawSettings, SettingsError,
    SourceMode, WebDavSettings,
};
use common_types::{ApiBackend, OutOfRange};
use std::path::{PathBuf, absolute};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub api: ApiSettings,
    pub evaluation: EvaluationSettings,
    pub source: SourceSettings,
    pub output: OutputSettings,
    pub watch: WatchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub backend: ApiBackend,
    pub openai: OpenAiSettings,
    pub ollama: OllamaSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub threshold: f32,
    pub workers: usize,
    pub batch_size: usize,
    pub resize_max: u32,
    pub max_images: Option<usize>,
    pub retry_failed: bool,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub out_of_range: OutOfRange,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub mode: SourceMode,
    pub image_folder: PathBuf,
    pub extensions: Vec<String>,
    pub webdav: WebDavSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub enabled: bool,
    pub interval: Duration,
}

fn absolute_or_given(path: PathBuf) -> PathBuf {
    absolute(&path).unwrap_or(path)
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = SettingsError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let api = ApiSettings {
            backend: raw.api.default_backend.parse()?,
            openai: raw.api.openai,
            ollama: raw.api.ollama,
        };
        let evaluation = EvaluationSettings {
            threshold: raw.evaluation.threshold,
            workers: raw.evaluation.workers,
            batch_size: raw.evaluation.batch_size,
            resize_max: raw.evaluation.resize_max,
            max_images: raw.evaluation.max_images,
            retry_failed: raw.evaluation.retry_failed,
            request_timeout: Duration::from_secs(raw.evaluation.request_timeout_secs),
            request_delay: Duration::from_millis(raw.evaluation.request_delay_ms),
            out_of_range: raw.evaluation.out_of_range,
        };
        let source = SourceSettings {
            mode: raw.source.mode,
            image_folder: absolute_or_given(raw.source.image_folder),
            extensions: raw
                .source
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            webdav: raw.source.webdav,
        };

        Ok(Self {
            api,
            evaluation,
            source,
            output: OutputSettings {
                result_folder: absolute_or_given(raw.output.result_folder),
            },
            watch: WatchSettings {
                enabled: raw.watch.enabled,
                interval: Duration::from_secs(raw.watch.interval_secs),
            },
            logging: raw.logging,
        })
    }
}

impl AppSettings {
    /// Checks the combination of settings a run needs. Call after CLI overrides are applied.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let has_key = self
            .api
            .openai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if self.api.backend == ApiBackend::OpenAi && !has_key {
            return Err(SettingsError::MissingApiKey);
        }

        let threshold = self.evaluation.threshold;
        if !(0.0..=10.0).contains(&threshold) {
            return Err(SettingsError::InvalidThreshold(threshold));
        }
        if self.evaluation.workers == 0 {
            return Err(SettingsError::ZeroValue("workers"));
        }
        if self.evaluation.batch_size == 0 {
            return Err(SettingsError::ZeroValue("batch size"));
        }

        if self.source.mode == SourceMode::WebDav {
            if self.webdav_url().is_none() {
                return Err(SettingsError::MissingWebDavUrl);
            }
            if self.watch.enabled {
                return Err(SettingsError::WatchRequiresLocalFolder);
            }
        }
        if self.watch.enabled && self.watch.interval.is_zero() {
            return Err(SettingsError::ZeroValue("watch interval"));
        }
        Ok(())
    }

    /// The configured WebDAV URL, if it is not blank.
    #[must_use]
    pub fn webdav_url(&self) -> Option<&str> {
        self.source
            .webdav
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Model name of the selected backend.
    #[must_use]
    pub fn model(&self) -> &str {
        match self.api.backend {
            ApiBackend::OpenAi => &self.api.openai.model,
            ApiBackend::Ollama => &self.api.ollama.model,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> AppSettings {
        let mut raw = RawSettings::default();
        raw.api.openai.api_key = Some("sk-test".to_string());
        AppSettings::try_from(raw).unwrap()
    }

    #[test]
    fn defaults_are_valid_with_an_api_key() {
        let settings = settings();
        settings.validate().unwrap();
        assert_eq!(settings.api.backend, ApiBackend::OpenAi);
        assert_eq!(settings.model(), "gpt-4o");
        assert_eq!(settings.evaluation.request_timeout, Duration::from_secs(120));
        assert!((settings.evaluation.threshold - 7.5).abs() < f32::EPSILON);
        assert!(settings.source.image_folder.is_absolute());
    }

    #[test]
    fn openai_requires_a_key_but_ollama_does_not() {
        let mut settings = settings();
        settings.api.openai.api_key = Some("  ".to_string());
        assert!(matches!(settings.validate(), Err(SettingsError::MissingApiKey)));

        settings.api.backend = ApiBackend::Ollama;
        settings.validate().unwrap();
        assert_eq!(settings.model(), "llava");
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let mut settings = settings();
        settings.evaluation.threshold = 10.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidThreshold(_))
        ));

        let mut settings = self::settings();
        settings.evaluation.workers = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroValue("workers"))
        ));

        let mut settings = self::settings();
        settings.evaluation.batch_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroValue("batch size"))
        ));
    }

    #[test]
    fn webdav_needs_a_url_and_cannot_be_watched() {
        let mut settings = settings();
        settings.source.mode = SourceMode::WebDav;
        settings.source.webdav.url = Some(String::new());
        assert!(matches!(settings.validate(), Err(SettingsError::MissingWebDavUrl)));

        settings.source.webdav.url = Some("https://dav.example.com".to_string());
        settings.validate().unwrap();

        settings.watch.enabled = true;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::WatchRequiresLocalFolder)
        ));
    }

    #[test]
    fn unknown_backend_fails_conversion() {
        let mut raw = RawSettings::default();
        raw.api.default_backend = "claude".to_string();
        assert!(matches!(
            AppSettings::try_from(raw),
            Err(SettingsError::UnknownBackend(_))
        ));
    }

    #[test]
    fn extensions_are_normalized() {
        let mut raw = RawSettings::default();
        raw.source.extensions = vec![".JPG".to_string(), "heic".to_string()];
        let settings = AppSettings::try_from(raw).unwrap();
        assert_eq!(settings.source.extensions, vec!["jpg", "heic"]);
    }
}
