use app_state::{AppSettings, DEFAULT_CONFIG_PATH, SourceMode};
use clap::Parser;
use common_types::ApiBackend;
use std::path::PathBuf;
use std::time::Duration;

/// Scores photos with a vision model and collects the good ones.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Local folder with photos to evaluate
    #[arg(short, long, conflicts_with = "webdav")]
    pub folder: Option<PathBuf>,

    /// Folder on the configured WebDAV server to evaluate
    #[arg(short = 'd', long)]
    pub webdav: Option<String>,

    /// Evaluate at most this many photos
    #[arg(short, long)]
    pub max: Option<usize>,

    /// Keep watching the folder and evaluate new photos as they arrive
    #[arg(short, long, action)]
    pub watch: bool,

    /// Seconds between evaluations of newly arrived photos in watch mode
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Number of concurrent requests
    #[arg(short = 'W', long)]
    pub workers: Option<usize>,

    /// Number of photos per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Longest side in pixels before upload, 0 to send originals
    #[arg(short, long)]
    pub resize: Option<u32>,

    /// Backend to use: openai or ollama
    #[arg(short, long)]
    pub api: Option<ApiBackend>,

    /// Ollama model name
    #[arg(short = 'O', long)]
    pub ollama_model: Option<String>,

    /// Ollama server URL
    #[arg(short = 'H', long)]
    pub ollama_host: Option<String>,

    /// Minimum overall score for a good photo
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Folder the run results are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Give photos whose request or answer failed a second attempt
    #[arg(long, action)]
    pub retry_failed: bool,

    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl Args {
    /// Flags win over every other settings layer.
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(folder) = &self.folder {
            settings.source.mode = SourceMode::Local;
            settings.source.image_folder.clone_from(folder);
        }
        if let Some(root) = &self.webdav {
            settings.source.mode = SourceMode::WebDav;
            settings.source.webdav.root.clone_from(root);
        }
        if self.max.is_some() {
            settings.evaluation.max_images = self.max;
        }
        if self.watch {
            settings.watch.enabled = true;
        }
        if let Some(seconds) = self.interval {
            settings.watch.interval = Duration::from_secs(seconds);
        }
        if let Some(workers) = self.workers {
            settings.evaluation.workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            settings.evaluation.batch_size = batch_size;
        }
        if let Some(resize) = self.resize {
            settings.evaluation.resize_max = resize;
        }
        if let Some(backend) = self.api {
            settings.api.backend = backend;
        }
        if let Some(model) = &self.ollama_model {
            settings.api.ollama.model.clone_from(model);
        }
        if let Some(host) = &self.ollama_host {
            settings.api.ollama.host.clone_from(host);
        }
        if let Some(threshold) = self.threshold {
            settings.evaluation.threshold = threshold;
        }
        if let Some(output) = &self.output {
            settings.output.result_folder.clone_from(output);
        }
        if self.retry_failed {
            settings.evaluation.retry_failed = true;
        }
    }
}
