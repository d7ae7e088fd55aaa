//! Fits every object of a table, one after the other.
//!
//! Each object goes through photometry, cutouts, PSFs, feedme, GalfitM and
//! result parsing. A failing object is logged and recorded; the run moves on.

use crate::adapters::table::ZeroPointTable;
use crate::core::builder::{output_band_path, FeedmeBuilder, FitInputs};
use crate::core::results::{result_record, ResultStore};
use crate::domain::model::{CutoutInfo, ObjectTarget};
use crate::domain::ports::{BatchSettings, CutoutService, FitRunner, Storage, SurveyCatalog};
use crate::feedme;
use crate::psf::{self, PsfParams};
use crate::utils::error::{GalfitError, Result};
use crate::utils::monitor::RunMonitor;
use crate::utils::task_pool::TaskPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub const BEFORE_FIT_TABLE: &str = "before_fit.csv";
pub const AFTER_FIT_TABLE: &str = "after_fit.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectOutcome {
    pub name: String,
    pub feedme: PathBuf,
    pub result_file: PathBuf,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedObject {
    pub name: String,
    pub category: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: Vec<ObjectOutcome>,
    pub failed: Vec<FailedObject>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

pub struct BatchRunner<S: Storage> {
    storage: S,
    catalog: Arc<dyn SurveyCatalog>,
    cutouts: Arc<dyn CutoutService>,
    runner: Arc<dyn FitRunner>,
    builder: FeedmeBuilder,
    zero_points: Option<ZeroPointTable>,
    data_folder: PathBuf,
    cut_size: u32,
    pool: TaskPool,
    monitor: RunMonitor,
}

impl<S: Storage> BatchRunner<S> {
    /// `storage` is rooted at the output folder.
    pub fn new(
        storage: S,
        settings: &dyn BatchSettings,
        catalog: Arc<dyn SurveyCatalog>,
        cutouts: Arc<dyn CutoutService>,
        runner: Arc<dyn FitRunner>,
    ) -> Self {
        Self {
            storage,
            catalog,
            cutouts,
            runner,
            builder: FeedmeBuilder::from_settings(settings),
            zero_points: None,
            data_folder: PathBuf::from(settings.data_folder()),
            cut_size: settings.cut_size(),
            pool: TaskPool::new(settings.workers()),
            monitor: RunMonitor::default(),
        }
    }

    pub fn with_zero_points(mut self, table: ZeroPointTable) -> Self {
        self.zero_points = Some(table);
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = RunMonitor::new(enabled);
        self
    }

    pub async fn run(&self, objects: &[ObjectTarget]) -> Result<BatchSummary> {
        let started_at = Utc::now();
        let run_id = started_at.format("%Y%m%dT%H%M%S").to_string();
        tracing::info!("🚀 Batch {} started with {} objects", run_id, objects.len());
        if self.zero_points.is_none() {
            tracing::warn!("⚠️ No zero-point table configured, using 0 for every band");
        }
        self.monitor.checkpoint("Batch started");

        let mut before = ResultStore::load(&self.storage, BEFORE_FIT_TABLE).await?;
        let mut after = ResultStore::load(&self.storage, AFTER_FIT_TABLE).await?;
        let mut processed = Vec::new();
        let mut failed = Vec::new();

        for (index, target) in objects.iter().enumerate() {
            tracing::info!("🔭 [{}/{}] Starting {}", index + 1, objects.len(), target.name);
            let started = Instant::now();

            match self.process(target, &mut before, &mut after).await {
                Ok((feedme, result_file)) => {
                    tracing::info!("✅ Finished {} in {:?}", target.name, started.elapsed());
                    processed.push(ObjectOutcome {
                        name: target.name.clone(),
                        feedme,
                        result_file,
                        duration_ms: started.elapsed().as_millis(),
                    });
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Skipping {}: {} (Category: {:?})",
                        target.name,
                        e.user_friendly_message(),
                        e.category()
                    );
                    failed.push(FailedObject {
                        name: target.name.clone(),
                        category: format!("{:?}", e.category()),
                        error: e.to_string(),
                    });
                }
            }

            // saved after every object so an interrupted run keeps finished results
            before.save(&self.storage).await?;
            after.save(&self.storage).await?;
            self.monitor.checkpoint(&format!("After {}", target.name));
        }

        let summary = BatchSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            processed,
            failed,
        };
        self.storage
            .write_file(SUMMARY_FILE, &serde_json::to_vec_pretty(&summary)?)
            .await?;

        self.monitor.summary(summary.total());
        tracing::info!(
            "📊 Batch {} done: {} fitted, {} failed",
            summary.run_id,
            summary.processed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    async fn process(
        &self,
        target: &ObjectTarget,
        before: &mut ResultStore,
        after: &mut ResultStore,
    ) -> Result<(PathBuf, PathBuf)> {
        let name = target.name.as_str();
        let bands = self.builder.bands();
        let data_dir = self.data_folder.join(name);
        let output_dir = self.storage.resolve(name);
        tokio::fs::create_dir_all(&data_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let photometry = self.catalog.photometry(target, bands).await?;
        tracing::debug!("Photometry for {}: {:?}", name, photometry);

        let mut cutouts = Vec::with_capacity(bands.len());
        for band in bands {
            let dest = data_dir.join(format!("{}_{}.fits", name, band));
            cutouts.push(
                self.cutouts
                    .fetch_cutout(target, band, self.cut_size, &dest)
                    .await?,
            );
        }

        let psfs = self.build_psfs(name, &data_dir, &cutouts).await?;
        let zero_points = self.zero_points_for(&cutouts)?;

        let inputs = FitInputs {
            target: target.clone(),
            photometry,
            cutouts,
            psfs,
            zero_points,
        };
        let model = self.builder.build(&inputs, &output_dir)?;
        model.validate_band_consistency();
        before.push(result_record(&model));

        let feedme_file = format!("{}/{}.feedme", name, name);
        self.storage
            .write_file(&feedme_file, feedme::render(&model).as_bytes())
            .await?;
        let feedme_path = self.storage.resolve(&feedme_file);

        let output = self.runner.run(&feedme_path).await?;
        tracing::debug!("GalfitM stdout for {}:\n{}", name, output.stdout);

        let band_file = output_band_path(&output_dir, name);
        let mut fitted = feedme::read_feedme(&band_file)?;
        fitted.set_name(name);
        after.push(result_record(&fitted));

        Ok((feedme_path, band_file))
    }

    /// One Moffat PSF per cutout, built on the task pool.
    async fn build_psfs(
        &self,
        name: &str,
        data_dir: &std::path::Path,
        cutouts: &[CutoutInfo],
    ) -> Result<Vec<(String, PathBuf)>> {
        let mut psfs = Vec::with_capacity(cutouts.len());
        for cutout in cutouts {
            let outfile = data_dir.join(format!("{}_{}_psf.fits", name, cutout.band));
            let params = match (cutout.fwhm_mean, cutout.fwhm_beta) {
                (Some(fwhm), Some(beta)) => Some(PsfParams { fwhm, beta }),
                _ => None,
            };
            let source = cutout.path.clone();
            let dest = outfile.clone();
            self.pool.submit(name, async move {
                tokio::task::spawn_blocking(move || {
                    psf::make_psf(&source, &dest, params, psf::DEFAULT_RADIUS).map(|_| ())
                })
                .await
                .map_err(std::io::Error::from)?
            });
            psfs.push((cutout.band.clone(), outfile));
        }
        let pending = self.pool.progress(name).iter().filter(|done| !**done).count();
        tracing::debug!("🧮 Waiting for {} of {} PSFs of {}", pending, cutouts.len(), name);

        let failures = self.pool.wait(name).await;
        if failures > 0 {
            return Err(GalfitError::FitsError {
                message: format!("{} of {} PSFs could not be built", failures, cutouts.len()),
            });
        }
        Ok(psfs)
    }

    fn zero_points_for(&self, cutouts: &[CutoutInfo]) -> Result<Vec<f64>> {
        let Some(table) = &self.zero_points else {
            return Ok(vec![0.0; cutouts.len()]);
        };
        cutouts
            .iter()
            .map(|cutout| {
                let field = cutout.field.as_deref().ok_or_else(|| {
                    GalfitError::MissingZeroPointError {
                        field: "<no field in header>".to_string(),
                        band: cutout.band.clone(),
                    }
                })?;
                table.get(field, &cutout.band)
            })
            .collect()
    }
}

/// Wires the S-PLUS client, GalfitM and local storage together and runs the
/// whole object table. Shared by the command-line front ends.
pub async fn run_from_settings(
    settings: &dyn BatchSettings,
    table_path: &str,
    survey: crate::adapters::splus::SplusConfig,
    zero_points: Option<&str>,
    monitor: bool,
) -> Result<BatchSummary> {
    use crate::adapters::{read_objects, SplusClient};
    use crate::config::cli::LocalStorage;
    use crate::core::invoker::GalfitmInvoker;

    let objects = read_objects(&tokio::fs::read(table_path).await?)?;
    let client = Arc::new(SplusClient::new(survey)?);
    let invoker = Arc::new(GalfitmInvoker::from_settings(settings));
    let storage = LocalStorage::new(settings.output_folder().to_string());

    let mut runner = BatchRunner::new(storage, settings, client.clone(), client, invoker)
        .with_monitoring(monitor);
    if let Some(path) = zero_points {
        let table = ZeroPointTable::from_csv(&tokio::fs::read(path).await?)?;
        tracing::info!("📋 Loaded {} zero points from {}", table.len(), path);
        runner = runner.with_zero_points(table);
    }

    runner.run(&objects).await
}
