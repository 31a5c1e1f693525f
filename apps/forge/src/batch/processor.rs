//! Worker pool that runs many independent generations. Each item gets its
//! own generator call and its own output file; the only shared resource is
//! the fixed-layout converter, which is serialized.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::DocumentStyleConfig;
use crate::render::converter::{FixedLayoutConverter, SerializedConverter, SofficeConverter};
use crate::render::generator::{GenerationOutput, ResumeGenerator};
use crate::render::style_provider::StyleProvider;

use super::report::{BatchFailure, BatchResults, BatchSuccess};

pub const DEFAULT_WORKERS: usize = 4;

/// One row of a batch CSV. Blank or missing cells fall back to the
/// processor's base configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvRow {
    pub json_file: Option<String>,
    pub output_name: Option<String>,
    pub margin_top: Option<f32>,
    pub margin_bottom: Option<f32>,
    pub margin_left: Option<f32>,
    pub margin_right: Option<f32>,
    pub font: Option<String>,
    pub font_size: Option<f32>,
}

impl CsvRow {
    pub fn style_config(&self, base: &DocumentStyleConfig) -> DocumentStyleConfig {
        let mut config = base.clone();
        if let Some(v) = self.margin_top {
            config.margin_top = v;
        }
        if let Some(v) = self.margin_bottom {
            config.margin_bottom = v;
        }
        if let Some(v) = self.margin_left {
            config.margin_left = v;
        }
        if let Some(v) = self.margin_right {
            config.margin_right = v;
        }
        if let Some(font) = self.font.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            config.font_name = font.to_string();
        }
        if let Some(v) = self.font_size {
            config.font_size_normal = v;
        }
        config
    }
}

struct BatchJob {
    input: String,
    json_path: PathBuf,
    base_name: String,
    generator: Arc<ResumeGenerator>,
}

impl BatchJob {
    fn run(&self, output_dir: &Path) -> Result<GenerationOutput, AppError> {
        self.generator
            .generate_from_json(&self.json_path, Some(output_dir), &self.base_name)
    }
}

/// An item either becomes a job or fails before reaching the pool.
enum Slot {
    Job(BatchJob),
    Rejected(BatchFailure),
}

pub struct BatchProcessor {
    config: DocumentStyleConfig,
    styles: Option<Arc<dyn StyleProvider>>,
    converter: Arc<dyn FixedLayoutConverter>,
    max_workers: usize,
}

impl BatchProcessor {
    pub fn new(config: DocumentStyleConfig, max_workers: usize) -> Result<Self, AppError> {
        config.validate()?;
        Ok(BatchProcessor {
            config,
            styles: None,
            converter: Arc::new(SerializedConverter::new(SofficeConverter::default())),
            max_workers: max_workers.max(1),
        })
    }

    /// Every worker shares `converter`; conversions run one at a time.
    pub fn with_converter<C: FixedLayoutConverter + 'static>(mut self, converter: C) -> Self {
        self.converter = Arc::new(SerializedConverter::new(converter));
        self
    }

    pub fn with_styles(mut self, styles: Arc<dyn StyleProvider>) -> Self {
        self.styles = Some(styles);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn generator(&self, config: DocumentStyleConfig) -> Result<ResumeGenerator, AppError> {
        let generator = ResumeGenerator::new(config)?.with_converter(Arc::clone(&self.converter));
        Ok(match &self.styles {
            Some(styles) => generator.with_styles(Arc::clone(styles)),
            None => generator,
        })
    }

    /// Generates every file into `output_dir` with the base configuration.
    /// Output names derive from each file's stem.
    pub async fn process_batch(&self, files: &[PathBuf], output_dir: &Path) -> BatchResults {
        let mut results = BatchResults::start();

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            let e = AppError::from(e);
            for file in files {
                results.failed.push(BatchFailure {
                    input: file.display().to_string(),
                    error: e.to_report_line(),
                });
            }
            results.finish();
            return results;
        }

        let slots = match self.generator(self.config.clone()) {
            Ok(generator) => {
                let generator = Arc::new(generator);
                files
                    .iter()
                    .map(|file| {
                        Slot::Job(BatchJob {
                            input: file.display().to_string(),
                            json_path: file.clone(),
                            base_name: file_stem(file),
                            generator: Arc::clone(&generator),
                        })
                    })
                    .collect()
            }
            Err(e) => files
                .iter()
                .map(|file| {
                    Slot::Rejected(BatchFailure {
                        input: file.display().to_string(),
                        error: e.to_report_line(),
                    })
                })
                .collect(),
        };

        self.run_slots(slots, output_dir, &mut results).await;
        results.finish();
        info!(
            "Batch finished: {} succeeded, {} failed in {:.2}s",
            results.successful.len(),
            results.failed.len(),
            results.duration_secs
        );
        results
    }

    /// Generates one resume per CSV row, each with its own configuration.
    ///
    /// Fails only when the CSV itself cannot be opened; bad rows are recorded
    /// as failed items.
    pub async fn process_from_csv(
        &self,
        csv_path: &Path,
        output_dir: &Path,
    ) -> Result<BatchResults, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(csv_path)?;
        std::fs::create_dir_all(output_dir)?;

        let mut results = BatchResults::start();
        let mut slots = Vec::new();

        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let line = i + 2; // header is line 1
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    slots.push(Slot::Rejected(BatchFailure {
                        input: format!("row {line}"),
                        error: AppError::from(e).to_report_line(),
                    }));
                    continue;
                }
            };
            slots.push(self.csv_slot(row, line));
        }

        self.run_slots(slots, output_dir, &mut results).await;
        results.finish();
        info!(
            "CSV batch {} finished: {} succeeded, {} failed",
            csv_path.display(),
            results.successful.len(),
            results.failed.len()
        );
        Ok(results)
    }

    fn csv_slot(&self, row: CsvRow, line: usize) -> Slot {
        let Some(json_file) = row.json_file.clone().filter(|f| !f.is_empty()) else {
            return Slot::Rejected(BatchFailure {
                input: format!("row {line}"),
                error: AppError::InvalidConfig("missing json_file".to_string()).to_report_line(),
            });
        };

        match self.generator(row.style_config(&self.config)) {
            Ok(generator) => {
                let json_path = PathBuf::from(&json_file);
                let base_name = row
                    .output_name
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| file_stem(&json_path));
                Slot::Job(BatchJob {
                    input: json_file,
                    json_path,
                    base_name,
                    generator: Arc::new(generator),
                })
            }
            Err(e) => Slot::Rejected(BatchFailure {
                input: json_file,
                error: e.to_report_line(),
            }),
        }
    }

    async fn run_slots(&self, slots: Vec<Slot>, output_dir: &Path, results: &mut BatchResults) {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut pending = Vec::with_capacity(slots.len());

        for slot in slots {
            match slot {
                Slot::Rejected(failure) => pending.push((failure.input.clone(), Err(failure))),
                Slot::Job(job) => {
                    let input = job.input.clone();
                    let semaphore = Arc::clone(&semaphore);
                    let output_dir = output_dir.to_path_buf();
                    let handle = tokio::spawn(async move {
                        let _permit = semaphore.acquire_owned().await.map_err(|e| {
                            AppError::Internal(anyhow::anyhow!("worker pool closed: {e}"))
                        })?;
                        tokio::task::spawn_blocking(move || job.run(&output_dir))
                            .await
                            .map_err(|e| {
                                AppError::Internal(anyhow::anyhow!(
                                    "spawn_blocking failed for batch item: {e}"
                                ))
                            })?
                    });
                    pending.push((input, Ok(handle)));
                }
            }
        }

        for (input, entry) in pending {
            let outcome = match entry {
                Err(failure) => Err(failure.error),
                Ok(handle) => match handle.await {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(e.to_report_line()),
                    Err(e) => Err(AppError::Internal(anyhow::anyhow!("batch worker failed: {e}"))
                        .to_report_line()),
                },
            };

            match outcome {
                Ok(output) => {
                    info!("Processed: {}", input);
                    results.successful.push(BatchSuccess {
                        input,
                        pdf: output.pdf.path().map(Path::to_path_buf),
                        word: output.word_path,
                    });
                }
                Err(error) => {
                    error!("Failed: {}: {}", input, error);
                    results.failed.push(BatchFailure { input, error });
                }
            }
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
