use color_eyre::eyre::{Result, eyre};
use common_types::{ImageRecord, RunSummary};
use language_model::OllamaClient;
use quality_judge::{EvaluationOptions, EvaluationOrchestrator};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        return Err(eyre!("usage: run_quality_judge <image>..."));
    }

    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = Path::new(path)
            .file_name()
            .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
        images.push(ImageRecord::new(name, path.as_str(), tokio::fs::read(path).await?));
    }

    let evaluator = Arc::new(OllamaClient::with_host("http://localhost:11434").build());
    let options = EvaluationOptions::default();
    let threshold = options.threshold;
    let orchestrator = EvaluationOrchestrator::new(evaluator, options);

    let now = Instant::now();
    let results = orchestrator.run(&images).await;
    for result in &results {
        match (&result.scores, &result.error) {
            (Some(scores), _) => info!("{}: {:.1} {:?}", result.name, scores.overall_score, scores.rationale),
            (_, Some(error)) => info!("{}: {error}", result.name),
            _ => {}
        }
    }

    let summary = RunSummary::from_results(&results, threshold);
    info!("Judged {} images in {:?}: {:?}", results.len(), now.elapsed(), summary);

    Ok(())
}
