use crate::domain::model::{BandPhotometry, CutoutInfo, ObjectTarget, RunOutput};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Location of `path` as seen by external programs.
    fn resolve(&self, path: &str) -> PathBuf;
}

/// Settings a batch run needs, whichever front end they come from.
pub trait BatchSettings: Send + Sync {
    fn bands(&self) -> &[String];
    fn cut_size(&self) -> u32;
    fn data_folder(&self) -> &str;
    fn output_folder(&self) -> &str;
    fn executable(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn components(&self) -> &[String];
    /// Extra base values applied after the defaults, e.g. `("P", "1")`.
    fn base_overrides(&self) -> Vec<(String, String)>;
    fn workers(&self) -> usize;
}

/// Per-band photometry from the survey catalog.
#[async_trait]
pub trait SurveyCatalog: Send + Sync {
    async fn photometry(&self, target: &ObjectTarget, bands: &[String])
        -> Result<Vec<BandPhotometry>>;
}

/// Image cutouts from the survey.
#[async_trait]
pub trait CutoutService: Send + Sync {
    async fn fetch_cutout(
        &self,
        target: &ObjectTarget,
        band: &str,
        size: u32,
        dest: &Path,
    ) -> Result<CutoutInfo>;
}

/// Runs the fitting executable on a feedme file.
#[async_trait]
pub trait FitRunner: Send + Sync {
    async fn run(&self, feedme: &Path) -> Result<RunOutput>;
}
