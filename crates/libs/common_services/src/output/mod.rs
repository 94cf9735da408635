mod summary;
mod writer;

pub use summary::{TOP_COUNT, ranked, render_summary};
pub use writer::{ResultWriter, good_copy_name};

use common_types::{ApiBackend, RunSummary};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write JSON results: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not write CSV results: {0}")]
    Csv(#[from] csv::Error),
}

/// Who evaluated the images and where they came from, for the written reports.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub backend: ApiBackend,
    pub model: String,
    pub source: String,
    pub threshold: f32,
}

/// Everything one run wrote to disk.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_dir: PathBuf,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    pub summary_path: PathBuf,
    pub good_dir: PathBuf,
    pub good_copies: Vec<PathBuf>,
    pub summary: RunSummary,
}
