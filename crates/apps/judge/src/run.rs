use app_state::{AppSettings, SettingsError, SourceMode};
use color_eyre::Result;
use common_services::output::{ResultWriter, RunContext, RunReport};
use common_services::source::{ImageSource, LocalFolderSource, WebDavSource};
use common_types::{ApiBackend, ImageRecord};
use language_model::{Evaluator, OllamaClient, OpenAiClient};
use quality_judge::{EvaluationOptions, EvaluationOrchestrator};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Outcome of evaluating everything the configured source lists.
pub struct InitialRun {
    pub source: String,
    /// `None` when the source had no images.
    pub report: Option<RunReport>,
    pub evaluated: HashSet<PathBuf>,
}

pub fn build_evaluator(settings: &AppSettings) -> Result<Arc<dyn Evaluator>> {
    let timeout = settings.evaluation.request_timeout;
    let evaluator: Arc<dyn Evaluator> = match settings.api.backend {
        ApiBackend::OpenAi => {
            let openai = &settings.api.openai;
            let api_key = openai
                .api_key
                .as_deref()
                .ok_or(SettingsError::MissingApiKey)?;
            Arc::new(
                OpenAiClient::with_api_key(api_key)
                    .base_url(&openai.base_url)
                    .model(openai.model.clone())
                    .max_tokens(openai.max_tokens)
                    .timeout(timeout)
                    .build(),
            )
        }
        ApiBackend::Ollama => Arc::new(
            OllamaClient::with_host(&settings.api.ollama.host)
                .model(settings.api.ollama.model.clone())
                .timeout(timeout)
                .build(),
        ),
    };
    Ok(evaluator)
}

#[must_use]
pub fn evaluation_options(settings: &AppSettings) -> EvaluationOptions {
    let evaluation = &settings.evaluation;
    EvaluationOptions {
        threshold: evaluation.threshold,
        workers: evaluation.workers,
        batch_size: evaluation.batch_size,
        resize_max: evaluation.resize_max,
        max_images: evaluation.max_images,
        retry_failed: evaluation.retry_failed,
        request_timeout: evaluation.request_timeout,
        request_delay: evaluation.request_delay,
        out_of_range: evaluation.out_of_range,
    }
}

#[must_use]
pub fn local_source(settings: &AppSettings) -> LocalFolderSource {
    LocalFolderSource::with_root(settings.source.image_folder.clone())
        .extensions(settings.source.extensions.clone())
        .build()
}

/// WebDAV sources are checked for reachability and credentials before use.
pub async fn build_source(settings: &AppSettings) -> Result<Box<dyn ImageSource>> {
    match settings.source.mode {
        SourceMode::Local => Ok(Box::new(local_source(settings))),
        SourceMode::WebDav => {
            let url = settings
                .webdav_url()
                .ok_or(SettingsError::MissingWebDavUrl)?;
            let webdav = &settings.source.webdav;
            let source = WebDavSource::with_url(url)
                .maybe_username(webdav.username.clone())
                .maybe_password(webdav.password.clone())
                .root(webdav.root.clone())
                .verify_tls(webdav.verify_ssl)
                .timeout(settings.evaluation.request_timeout)
                .extensions(settings.source.extensions.clone())
                .build()?;
            source.check().await?;
            info!("🔐 Connected to WebDAV at {}", source.describe());
            Ok(Box::new(source))
        }
    }
}

/// Evaluates `images` and writes a new run folder for them.
pub async fn evaluate_images(
    settings: &AppSettings,
    evaluator: Arc<dyn Evaluator>,
    images: Vec<ImageRecord>,
    source: String,
) -> Result<RunReport> {
    let context = RunContext {
        backend: evaluator.backend(),
        model: evaluator.model().to_string(),
        source,
        threshold: settings.evaluation.threshold,
    };
    let orchestrator = EvaluationOrchestrator::new(evaluator, evaluation_options(settings));
    let results = orchestrator.run(&images).await;

    let result_root = settings.output.result_folder.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<RunReport> {
        let writer = ResultWriter::create(&result_root)?;
        Ok(writer.write(&results, &images, &context)?)
    })
    .await??;

    let summary = &report.summary;
    info!(
        "🏁 {}/{} photos are good ({:.1}%), {} failed. Results in {}",
        summary.good,
        summary.total,
        summary.good_percentage(),
        summary.failed,
        report.run_dir.display()
    );
    Ok(report)
}

pub async fn run_once(settings: &AppSettings, evaluator: Arc<dyn Evaluator>) -> Result<InitialRun> {
    let source = build_source(settings).await?;
    let description = source.describe();
    info!("🔍 Listing images in {description}");
    let images = source.list_images(settings.evaluation.max_images).await?;
    if images.is_empty() {
        return Ok(InitialRun {
            source: description,
            report: None,
            evaluated: HashSet::new(),
        });
    }

    let evaluated = images
        .iter()
        .map(|image| PathBuf::from(&image.source_path))
        .collect();
    let report = evaluate_images(settings, evaluator, images, description.clone()).await?;
    Ok(InitialRun {
        source: description,
        report: Some(report),
        evaluated,
    })
}
