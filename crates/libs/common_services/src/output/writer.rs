use super::{OutputError, RunContext, RunReport, render_summary};
use chrono::{DateTime, Local};
use common_types::{ApiBackend, EvaluationResult, ImageRecord, RunSummary};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const JSON_FILE: &str = "evaluation_results.json";
pub const CSV_FILE: &str = "evaluation_results.csv";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const GOOD_DIR: &str = "good_photos";

const CSV_HEADER: [&str; 15] = [
    "filename",
    "path",
    "score",
    "is_good",
    "composition",
    "exposure",
    "color",
    "focus",
    "subject",
    "overall_impression",
    "width",
    "height",
    "size_bytes",
    "format",
    "error",
];

#[derive(Serialize)]
struct ResultsDocument<'a> {
    generated_at: String,
    source: &'a str,
    backend: ApiBackend,
    model: &'a str,
    summary: &'a RunSummary,
    results: &'a [ResultEntry<'a>],
}

/// A result plus what is known about its image file.
#[derive(Serialize)]
struct ResultEntry<'a> {
    #[serde(flatten)]
    result: &'a EvaluationResult,
    width: Option<usize>,
    height: Option<usize>,
    size_bytes: Option<usize>,
    format: Option<&'static str>,
}

impl<'a> ResultEntry<'a> {
    fn new(result: &'a EvaluationResult, image: Option<&ImageRecord>) -> Self {
        let dimensions = image.and_then(ImageRecord::dimensions);
        Self {
            result,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            size_bytes: image.map(ImageRecord::size_bytes),
            format: image.and_then(ImageRecord::format),
        }
    }

    fn csv_record(&self) -> Vec<String> {
        let result = self.result;
        let optional = |value: Option<usize>| value.map(|v| v.to_string()).unwrap_or_default();

        let mut record = vec![
            result.name.clone(),
            result.source_path.clone(),
            result
                .overall_score()
                .map(|s| format!("{s:.1}"))
                .unwrap_or_default(),
            if result.is_good { "Yes" } else { "No" }.to_string(),
        ];
        match &result.scores {
            Some(scores) => record.extend(scores.sub_scores().iter().map(|(_, v)| format!("{v:.1}"))),
            None => record.extend(std::iter::repeat_n(String::new(), 6)),
        }
        record.push(optional(self.width));
        record.push(optional(self.height));
        record.push(optional(self.size_bytes));
        record.push(self.format.unwrap_or_default().to_string());
        record.push(result.error.as_ref().map(ToString::to_string).unwrap_or_default());
        record
    }
}

/// File name for the copy of a good image: `IMG_1_score8.5.jpg`.
#[must_use]
pub fn good_copy_name(image: &ImageRecord, score: f32) -> String {
    let extension = Path::new(&image.name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_score{score:.1}{extension}", image.stem())
}

/// First of `dir/name`, `dir/stem_2.ext`, `dir/stem_3.ext`, ... that does not exist yet.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Writes the artifacts of one run into its own timestamped folder.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    run_dir: PathBuf,
    good_dir: PathBuf,
    started_at: DateTime<Local>,
}

impl ResultWriter {
    /// Creates `result_root/run_<YYYYmmdd_HHMMSS>/good_photos`.
    pub fn create(result_root: &Path) -> Result<Self, OutputError> {
        Self::create_at(result_root, Local::now())
    }

    pub fn create_at(result_root: &Path, started_at: DateTime<Local>) -> Result<Self, OutputError> {
        fs::create_dir_all(result_root)?;
        let base = format!("run_{}", started_at.format("%Y%m%d_%H%M%S"));
        let mut run_dir = result_root.join(&base);
        let mut suffix = 2;
        while run_dir.exists() {
            run_dir = result_root.join(format!("{base}_{suffix}"));
            suffix += 1;
        }
        let good_dir = run_dir.join(GOOD_DIR);
        fs::create_dir_all(&good_dir)?;
        info!("📁 Writing results to {}", run_dir.display());

        Ok(Self {
            run_dir,
            good_dir,
            started_at,
        })
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Writes JSON, CSV and summary files and copies good images. `images` supplies the
    /// bytes and metadata; results are matched to images by source path.
    pub fn write(
        &self,
        results: &[EvaluationResult],
        images: &[ImageRecord],
        context: &RunContext,
    ) -> Result<RunReport, OutputError> {
        let by_path: HashMap<&str, &ImageRecord> = images
            .iter()
            .map(|image| (image.source_path.as_str(), image))
            .collect();
        let entries: Vec<ResultEntry> = results
            .iter()
            .map(|r| ResultEntry::new(r, by_path.get(r.source_path.as_str()).copied()))
            .collect();
        let summary = RunSummary::from_results(results, context.threshold);

        let json_path = self.run_dir.join(JSON_FILE);
        let document = ResultsDocument {
            generated_at: self.started_at.to_rfc3339(),
            source: &context.source,
            backend: context.backend,
            model: &context.model,
            summary: &summary,
            results: &entries,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(&json_path)?), &document)?;

        let csv_path = self.run_dir.join(CSV_FILE);
        let mut csv_writer = csv::Writer::from_path(&csv_path)?;
        csv_writer.write_record(CSV_HEADER)?;
        for entry in &entries {
            csv_writer.write_record(entry.csv_record())?;
        }
        csv_writer.flush()?;

        let summary_path = self.run_dir.join(SUMMARY_FILE);
        fs::write(
            &summary_path,
            render_summary(results, &summary, context, self.started_at),
        )?;

        let mut good_copies = Vec::new();
        for result in results.iter().filter(|r| r.is_good) {
            let (Some(image), Some(score)) = (
                by_path.get(result.source_path.as_str()),
                result.overall_score(),
            ) else {
                warn!("No image data for good result {}", result.source_path);
                continue;
            };
            let target = unique_path(&self.good_dir, &good_copy_name(image, score));
            fs::write(&target, &image.bytes)?;
            good_copies.push(target);
        }

        info!(
            "💾 Saved {} results and {} good photos to {}",
            results.len(),
            good_copies.len(),
            self.run_dir.display()
        );

        Ok(RunReport {
            run_dir: self.run_dir.clone(),
            json_path,
            csv_path,
            summary_path,
            good_dir: self.good_dir.clone(),
            good_copies,
            summary,
        })
    }
}
