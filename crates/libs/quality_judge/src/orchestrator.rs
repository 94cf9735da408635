use crate::{RUBRIC_PROMPT, parse_scores, prepare_image};
use common_types::{EvaluationResult, FailureKind, FailureReason, ImageRecord, OutOfRange};
use language_model::Evaluator;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Overall score at or above which an image counts as good.
    pub threshold: f32,
    pub workers: usize,
    pub batch_size: usize,
    /// Longest side in pixels before sending; 0 sends the original size.
    pub resize_max: u32,
    pub max_images: Option<usize>,
    /// Evaluate `Api` and `Parse` failures once more after each batch.
    pub retry_failed: bool,
    pub request_timeout: Duration,
    /// Pause after every request, for rate limited APIs.
    pub request_delay: Duration,
    /// Applied on top of the evaluator's own parse policy.
    pub out_of_range: OutOfRange,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            threshold: 7.5,
            workers: 4,
            batch_size: 10,
            resize_max: 1024,
            max_images: None,
            retry_failed: false,
            request_timeout: Duration::from_secs(120),
            request_delay: Duration::ZERO,
            out_of_range: OutOfRange::Clamp,
        }
    }
}

type ClaimQueue = Arc<Mutex<std::iter::Enumerate<std::vec::IntoIter<ImageRecord>>>>;
type Slots = Arc<std::sync::Mutex<Vec<Option<EvaluationResult>>>>;

/// Runs images through an [`Evaluator`] in sequential batches, each batch served by a
/// fixed pool of workers. Every input image gets exactly one result, in input order.
pub struct EvaluationOrchestrator {
    evaluator: Arc<dyn Evaluator>,
    options: EvaluationOptions,
}

impl EvaluationOrchestrator {
    #[must_use]
    pub fn new(evaluator: Arc<dyn Evaluator>, options: EvaluationOptions) -> Self {
        Self { evaluator, options }
    }

    pub async fn run(&self, images: &[ImageRecord]) -> Vec<EvaluationResult> {
        let limit = self
            .options
            .max_images
            .map_or(images.len(), |max| max.min(images.len()));
        let images = &images[..limit];
        let batch_size = self.options.batch_size.max(1);
        let batch_count = images.len().div_ceil(batch_size);
        info!(
            "🚀 Evaluating {} images with {} ({}) in {} batches",
            images.len(),
            self.evaluator.model(),
            self.evaluator.backend(),
            batch_count
        );

        let mut results = Vec::with_capacity(images.len());
        for (batch_index, batch) in images.chunks(batch_size).enumerate() {
            let now = Instant::now();
            info!(
                "📦 Batch {}/{}: {} images",
                batch_index + 1,
                batch_count,
                batch.len()
            );

            let mut batch_results = self.evaluate_batch(batch, 1).await;
            if self.options.retry_failed {
                self.retry_failures(batch, &mut batch_results).await;
            }

            let good = batch_results.iter().filter(|r| r.is_good).count();
            let failed = batch_results.iter().filter(|r| r.is_failed()).count();
            info!(
                "✅ Batch {}/{} done in {:?}: {} good, {} failed",
                batch_index + 1,
                batch_count,
                now.elapsed(),
                good,
                failed
            );
            results.extend(batch_results);
        }
        results
    }

    async fn retry_failures(&self, batch: &[ImageRecord], results: &mut [EvaluationResult]) {
        let retry_indices: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.error.as_ref().is_some_and(|e| e.kind.is_retryable()))
            .map(|(i, _)| i)
            .collect();
        if retry_indices.is_empty() {
            return;
        }

        info!("🔁 Retrying {} failed images", retry_indices.len());
        let retry_images: Vec<ImageRecord> =
            retry_indices.iter().map(|&i| batch[i].clone()).collect();
        let retried = self.evaluate_batch(&retry_images, 2).await;
        for (index, result) in retry_indices.into_iter().zip(retried) {
            results[index] = result;
        }
    }

    /// Workers claim images from a shared queue until it is empty. Each image runs in its
    /// own task, so a panic fails only that image. Each result lands in the slot of the
    /// image's position within `batch`.
    async fn evaluate_batch(&self, batch: &[ImageRecord], attempt: u32) -> Vec<EvaluationResult> {
        let queue: ClaimQueue = Arc::new(Mutex::new(batch.to_vec().into_iter().enumerate()));
        let slots: Slots = Arc::new(std::sync::Mutex::new(
            (0..batch.len()).map(|_| None).collect(),
        ));

        let worker_count = self.options.workers.max(1).min(batch.len());
        let options = Arc::new(self.options.clone());
        let mut join_set = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let slots = Arc::clone(&slots);
            let evaluator = Arc::clone(&self.evaluator);
            let options = Arc::clone(&options);
            join_set.spawn(async move {
                loop {
                    let claimed = queue.lock().await.next();
                    let Some((index, image)) = claimed else {
                        break;
                    };
                    debug!("🐜 Worker {worker_id} picked up {}", image.name);
                    let task = tokio::spawn({
                        let evaluator = Arc::clone(&evaluator);
                        let options = Arc::clone(&options);
                        let image = image.clone();
                        async move { evaluate_image(evaluator.as_ref(), &options, &image, attempt).await }
                    });
                    let result = task.await.unwrap_or_else(|e| {
                        error!("💥 Evaluating {} died: {e}", image.name);
                        let reason = FailureReason::new(
                            FailureKind::Task,
                            format!("evaluation task died: {e}"),
                        );
                        EvaluationResult::failed(&image, reason, attempt)
                    });
                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                error!("💥 Evaluation worker died: {e}");
            }
        }

        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter_mut()
            .zip(batch)
            .map(|(slot, image)| {
                slot.take().unwrap_or_else(|| {
                    let reason = FailureReason::new(
                        FailureKind::Task,
                        "evaluation task ended before producing a result",
                    );
                    EvaluationResult::failed(image, reason, attempt)
                })
            })
            .collect()
    }
}

/// Prepare, send, parse. Any failure along the way becomes a failed result for this
/// image only.
async fn evaluate_image(
    evaluator: &dyn Evaluator,
    options: &EvaluationOptions,
    image: &ImageRecord,
    attempt: u32,
) -> EvaluationResult {
    let now = Instant::now();
    let fail = |kind: FailureKind, message: String| {
        warn!("❌ {} failed ({kind}): {message}", image.name);
        EvaluationResult::failed(image, FailureReason::new(kind, message), attempt)
    };

    let bytes = image.bytes.clone();
    let max_dimension = options.resize_max;
    let prepared = match tokio::task::spawn_blocking(move || prepare_image(&bytes, max_dimension)).await {
        Ok(Ok(prepared)) => prepared,
        Ok(Err(e)) => return fail(FailureKind::Image, e.to_string()),
        Err(e) => return fail(FailureKind::Task, format!("image preparation panicked: {e}")),
    };

    let response = timeout(
        options.request_timeout,
        evaluator.evaluate(&prepared, RUBRIC_PROMPT),
    )
    .await;
    if !options.request_delay.is_zero() {
        sleep(options.request_delay).await;
    }
    let text = match response {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return fail(FailureKind::Api, e.to_string()),
        Err(_) => {
            return fail(
                FailureKind::Api,
                format!("request timed out after {:?}", options.request_timeout),
            );
        }
    };

    let policy = evaluator
        .parse_policy()
        .with_out_of_range(options.out_of_range);
    match parse_scores(&text, policy) {
        Ok(scores) => {
            let result = EvaluationResult::scored(image, scores, options.threshold, attempt);
            info!(
                "📸 {} scored {:.1}{} in {:?}",
                image.name,
                result.overall_score().unwrap_or_default(),
                if result.is_good { " ⭐" } else { "" },
                now.elapsed()
            );
            result
        }
        Err(e) => fail(FailureKind::Parse, e.to_string()),
    }
}
