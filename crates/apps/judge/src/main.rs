mod cli;
mod logging;
mod run;
mod watcher;

use crate::cli::Args;
use crate::logging::init_tracing;
use crate::run::{build_evaluator, run_once};
use crate::watcher::watch_folder;
use app_state::load_app_settings_from;
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::bail;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut settings = load_app_settings_from(&args.config)?;
    args.apply(&mut settings);
    init_tracing(&settings.logging)?;
    settings.validate()?;

    let evaluator = build_evaluator(&settings)?;
    info!(
        "🤖 Evaluating with {} model {}, threshold {}",
        evaluator.backend(),
        evaluator.model(),
        settings.evaluation.threshold
    );

    let run = run_once(&settings, evaluator.clone()).await?;
    if run.report.is_none() {
        if !settings.watch.enabled {
            bail!("No images found in {}", run.source);
        }
        warn!("No images found in {}, waiting for new ones", run.source);
    }

    if settings.watch.enabled {
        watch_folder(&settings, evaluator, run.evaluated).await?;
    }

    Ok(())
}
