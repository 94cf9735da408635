use crate::{AppSettings, RawSettings, SettingsError};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

/// Plain environment variables and the settings key each one overrides. These win over
/// `APP__` variables and the settings file.
pub const ENV_OVERRIDES: [(&str, &str); 14] = [
    ("OPENAI_API_KEY", "api.openai.api_key"),
    ("DEFAULT_API", "api.default_backend"),
    ("OLLAMA_HOST", "api.ollama.host"),
    ("OLLAMA_MODEL", "api.ollama.model"),
    ("QUALITY_THRESHOLD", "evaluation.threshold"),
    ("DEFAULT_IMAGE_FOLDER", "source.image_folder"),
    ("RESULT_FOLDER", "output.result_folder"),
    ("WEBDAV_URL", "source.webdav.url"),
    ("WEBDAV_USERNAME", "source.webdav.username"),
    ("WEBDAV_PASSWORD", "source.webdav.password"),
    ("WEBDAV_ROOT", "source.webdav.root"),
    ("WEBDAV_VERIFY_SSL", "source.webdav.verify_ssl"),
    ("WATCH_FOLDER", "watch.enabled"),
    ("WATCH_INTERVAL", "watch.interval_secs"),
];

/// Loads settings from an optional YAML file, `.env` and the process environment.
pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings, SettingsError> {
    // .env must be loaded before the environment is read.
    dotenv::from_path(".env").ok();
    let env: HashMap<String, String> = std::env::vars().collect();
    build_settings(config_path, &env)
}

/// Layers, lowest first: defaults, settings file, `APP__` variables, plain variables.
pub fn build_settings(
    config_path: &Path,
    env: &HashMap<String, String>,
) -> Result<AppSettings, SettingsError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );
    let builder = apply_env_overrides(builder, env)?;

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    AppSettings::try_from(raw_settings)
}

fn apply_env_overrides(
    mut builder: ConfigBuilder<DefaultState>,
    env: &HashMap<String, String>,
) -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    for (variable, key) in ENV_OVERRIDES {
        let value = env
            .get(variable)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        builder = builder.set_override_option(key, value)?;
    }
    Ok(builder)
}
