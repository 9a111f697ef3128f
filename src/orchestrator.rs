//! Comparison orchestrator.
//!
//! Drives every page of a [`PageSet`] through
//! `Pending -> Capturing -> Normalizing -> Diffing -> Scored`, or stops early
//! at `AcquisitionError` / `SizeMismatch`. A page's step never fails
//! outward: every error, timeout or panic is folded into that page's
//! [`ComparisonResult`], and the loop always produces one result per page in
//! page-set order.
//!
//! Pages run one at a time by default. With `workers > 1` up to that many
//! pages are in flight, each owned by a single task; results land in a
//! position-indexed slot so completion order never affects the output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::capture::{Acquirer, CaptureRequest, discard_partial};
use crate::compare::{ComparisonResult, Outcome, PageStage};
use crate::config::{CANONICAL_HEIGHT, CANONICAL_WIDTH, DEFAULT_CAPTURE_TIMEOUT, DEFAULT_RUN_DEADLINE};
use crate::error::{RunError, RunResult};
use crate::layout::ArtifactLayout;
use crate::pages::{Environment, PagePath, PageSet};
use crate::raster::{DiffError, PixelDiffer, PngCodec, RasterCodec, RasterDiffer, normalize_image};

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Artifact locations (also fixes the device profile)
    pub layout: ArtifactLayout,
    /// Canonical canvas `(width, height)`
    pub canvas: (u32, u32),
    /// Bound on each individual capture
    pub capture_timeout: Duration,
    /// Bound on the whole run
    pub run_deadline: Duration,
    /// Fixed end of the run, shared by every run using this context.
    /// When unset, each [`Orchestrator::run`] starts its own `run_deadline`.
    pub deadline: Option<Instant>,
    /// Pages in flight at once
    pub workers: usize,
}

impl RunContext {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            layout,
            canvas: (CANONICAL_WIDTH, CANONICAL_HEIGHT),
            capture_timeout: Duration::from_secs(DEFAULT_CAPTURE_TIMEOUT),
            run_deadline: Duration::from_secs(DEFAULT_RUN_DEADLINE),
            deadline: None,
            workers: 1,
        }
    }

    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = (width, height);
        self
    }

    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    pub fn run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = deadline;
        self
    }

    /// End the run at `deadline` regardless of when `run` starts
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Runs the comparison pipeline over a page set
pub struct Orchestrator<A, C = PngCodec, D = PixelDiffer> {
    acquirer: Arc<A>,
    codec: Arc<C>,
    differ: Arc<D>,
    ctx: Arc<RunContext>,
}

impl<A, C, D> Clone for Orchestrator<A, C, D> {
    fn clone(&self) -> Self {
        Self {
            acquirer: Arc::clone(&self.acquirer),
            codec: Arc::clone(&self.codec),
            differ: Arc::clone(&self.differ),
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<A> Orchestrator<A, PngCodec, PixelDiffer>
where
    A: Acquirer + 'static,
{
    /// Orchestrator with the default codec and differ
    pub fn new(acquirer: A, ctx: RunContext) -> Self {
        Self::with_parts(acquirer, PngCodec::new(), PixelDiffer::default(), ctx)
    }
}

impl<A, C, D> Orchestrator<A, C, D>
where
    A: Acquirer + 'static,
    C: RasterCodec + 'static,
    D: RasterDiffer + 'static,
{
    pub fn with_parts(acquirer: A, codec: C, differ: D, ctx: RunContext) -> Self {
        Self {
            acquirer: Arc::new(acquirer),
            codec: Arc::new(codec),
            differ: Arc::new(differ),
            ctx: Arc::new(ctx),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Compare every page. Only artifact-directory setup can fail the run.
    pub async fn run(&self, pages: &PageSet) -> RunResult<Vec<ComparisonResult>> {
        self.ctx
            .layout
            .init(pages)
            .map_err(|source| RunError::Artifacts {
                path: self.ctx.layout.device_dir().display().to_string(),
                source,
            })?;

        let deadline = self
            .ctx
            .deadline
            .unwrap_or_else(|| Instant::now() + self.ctx.run_deadline);
        let total = pages.len();
        let semaphore = Arc::new(Semaphore::new(self.ctx.workers.max(1)));
        let mut slots: Vec<Option<ComparisonResult>> = vec![None; total];
        let mut tasks = JoinSet::new();

        log::info!(
            "comparing {} pages on {} with {} worker(s) via {}",
            total,
            self.ctx.layout.device,
            self.ctx.workers,
            self.acquirer.source_type()
        );

        for (index, (page, stem)) in pages.entries().enumerate() {
            // Permits are taken in page order, so a single worker is strictly sequential
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let this = self.clone();
            let page = page.clone();
            let stem = stem.to_string();
            let staging_url = pages.staging.resolve(&page);
            let production_url = pages.production.resolve(&page);
            tasks.spawn(async move {
                let _permit = permit;
                log::info!("[{}/{}] {}", index + 1, total, page);
                let result = this
                    .compare_page(page, stem, staging_url, production_url, deadline)
                    .await;
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => log::error!("comparison task failed: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(&pages.pages)
            .map(|(slot, page)| {
                slot.unwrap_or_else(|| {
                    ComparisonResult::error(
                        page.clone(),
                        pages.staging.resolve(page),
                        pages.production.resolve(page),
                        "comparison task aborted before producing a result",
                    )
                })
            })
            .collect();

        Ok(results)
    }

    /// One page, start to terminal state. Never fails outward.
    pub async fn compare_page(
        &self,
        page: PagePath,
        stem: String,
        staging_url: String,
        production_url: String,
        deadline: Instant,
    ) -> ComparisonResult {
        let layout = &self.ctx.layout;
        log::debug!("{}: {}", page, PageStage::Pending);

        if Instant::now() >= deadline {
            log::warn!("{}: run deadline exceeded, not captured", page);
            return ComparisonResult::error(
                page,
                staging_url,
                production_url,
                "run deadline exceeded before capture",
            );
        }

        layout.clear_page(&stem);

        log::debug!("{}: {}", page, PageStage::Capturing);
        let staging_path = layout.capture_path(Environment::Staging, &stem);
        let production_path = layout.capture_path(Environment::Production, &stem);

        let staging_status = self
            .acquire(Environment::Staging, &staging_url, &staging_path, deadline)
            .await;
        let production_status = self
            .acquire(Environment::Production, &production_url, &production_path, deadline)
            .await;

        let staging_capture = existing(&staging_path);
        let production_capture = existing(&production_path);

        let failures: Vec<String> = [staging_status.err(), production_status.err()]
            .into_iter()
            .flatten()
            .collect();

        let result = ComparisonResult::error(page.clone(), staging_url, production_url, "")
            .with_captures(staging_capture.clone(), production_capture.clone());

        if !failures.is_empty() {
            let message = failures.join("; ");
            log::warn!("{}: {}", page, message);
            return ComparisonResult {
                outcome: Outcome::AcquisitionError { message },
                ..result
            };
        }

        let (Some(staging_capture), Some(production_capture)) = (staging_capture, production_capture)
        else {
            let message = "capture reported success but no file was written".to_string();
            log::warn!("{}: {}", page, message);
            return ComparisonResult {
                outcome: Outcome::AcquisitionError { message },
                ..result
            };
        };

        let this = self.clone();
        let scored_page = page.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            this.score(&scored_page, &stem, &staging_capture, &production_capture)
        })
        .await
        .unwrap_or_else(|e| Outcome::AcquisitionError {
            message: format!("comparison failed unexpectedly: {}", e),
        });

        match &outcome {
            Outcome::Scored { similarity, .. } => log::info!("{}: {:.2}% similar", page, similarity),
            Outcome::AcquisitionError { message } => log::warn!("{}: {}", page, message),
            Outcome::SizeMismatch { .. } => {}
        }

        ComparisonResult { outcome, ..result }
    }

    /// Run one capture under the per-capture timeout, cut off at the run deadline
    async fn acquire(
        &self,
        environment: Environment,
        url: &str,
        output: &Path,
        deadline: Instant,
    ) -> Result<(), String> {
        let request = CaptureRequest {
            url: url.to_string(),
            output: output.to_path_buf(),
            device: self.ctx.layout.device,
            environment,
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = self.ctx.capture_timeout.min(remaining);

        match tokio::time::timeout(budget, self.acquirer.capture(&request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{} capture failed: {}", environment, e)),
            Err(_) => {
                discard_partial(output).await;
                let _ = tokio::fs::remove_file(output).await;
                if budget < self.ctx.capture_timeout {
                    Err(format!("{} capture cut off by run deadline", environment))
                } else {
                    Err(format!(
                        "{} capture timed out after {}s",
                        environment,
                        budget.as_secs_f64()
                    ))
                }
            }
        }
    }

    /// Decode, normalize and diff both captures; write the mask
    fn score(&self, page: &PagePath, stem: &str, staging: &Path, production: &Path) -> Outcome {
        match self.try_score(page, stem, staging, production) {
            Ok(outcome) => outcome,
            Err(message) => Outcome::AcquisitionError { message },
        }
    }

    fn try_score(
        &self,
        page: &PagePath,
        stem: &str,
        staging: &Path,
        production: &Path,
    ) -> Result<Outcome, String> {
        let codec: &dyn RasterCodec = &*self.codec;
        let (width, height) = self.ctx.canvas;

        log::debug!("{}: {}", page, PageStage::Normalizing);
        let load = |environment: Environment, path: &Path| -> Result<image::RgbaImage, String> {
            let bytes = fs::read(path)
                .map_err(|e| format!("failed to read {} capture: {}", environment, e))?;
            let decoded = codec
                .decode(&bytes)
                .map_err(|e| format!("{} capture: {}", environment, e))?;
            Ok(normalize_image(codec, &decoded, width, height))
        };
        let a = load(Environment::Staging, staging)?;
        let b = load(Environment::Production, production)?;

        if a.dimensions() != b.dimensions() {
            log::error!(
                "{}: normalized sizes disagree ({:?} vs {:?}); normalizer bug",
                page,
                a.dimensions(),
                b.dimensions()
            );
            return Ok(Outcome::SizeMismatch {
                staging: a.dimensions(),
                production: b.dimensions(),
            });
        }

        log::debug!("{}: {}", page, PageStage::Diffing);
        let diff = match self.differ.diff(&a, &b) {
            Ok(diff) => diff,
            Err(DiffError::DimensionMismatch { .. }) => {
                return Ok(Outcome::SizeMismatch {
                    staging: a.dimensions(),
                    production: b.dimensions(),
                });
            }
        };

        let diff_artifact: PathBuf = self.ctx.layout.diff_path(stem);
        let mask = codec
            .encode(&diff.mask)
            .map_err(|e| format!("diff mask: {}", e))?;
        fs::write(&diff_artifact, mask)
            .map_err(|e| format!("failed to write diff mask {}: {}", diff_artifact.display(), e))?;

        Ok(Outcome::Scored {
            similarity: diff.similarity,
            diff_artifact,
        })
    }
}

fn existing(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}
