//! Runs the GalfitM executable on a feedme file.

use crate::domain::model::RunOutput;
use crate::domain::ports::{BatchSettings, FitRunner};
use crate::feedme::{self, Model};
use crate::utils::error::{GalfitError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

pub const DEFAULT_EXECUTABLE: &str = "galfitm";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Clone)]
pub struct GalfitmInvoker {
    executable: PathBuf,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl Default for GalfitmInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE, DEFAULT_TIMEOUT_SECONDS)
    }
}

impl GalfitmInvoker {
    pub fn new(executable: impl Into<PathBuf>, timeout_seconds: u64) -> Self {
        Self {
            executable: executable.into(),
            timeout: Duration::from_secs(timeout_seconds),
            working_dir: None,
        }
    }

    pub fn from_settings(settings: &dyn BatchSettings) -> Self {
        Self::new(settings.executable(), settings.timeout_seconds())
    }

    /// GalfitM writes `fit.log` and `galfit.NN` restart files into its
    /// working directory. Defaults to the current one.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `<executable> <feedme>` and captures both output streams. The
    /// child is killed when the timeout expires.
    pub async fn run(&self, feedme: &Path) -> Result<RunOutput> {
        let mut command = Command::new(&self.executable);
        command
            .arg(feedme)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(
            "🚀 Running {} {}",
            self.executable.display(),
            feedme.display()
        );
        let started = Instant::now();
        let child = command.spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::error!(
                    "⏰ GalfitM did not finish within {}s, killed",
                    self.timeout.as_secs()
                );
                return Err(GalfitError::ExternalToolTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let duration = started.elapsed();

        if !output.status.success() {
            return Err(GalfitError::ExternalToolFailure {
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        tracing::debug!("GalfitM finished in {:?}", duration);
        Ok(RunOutput {
            stdout,
            stderr,
            duration,
        })
    }

    /// Checks band consistency (advisory), writes the feedme and runs it.
    pub async fn run_model(&self, model: &Model, feedme_path: &Path) -> Result<RunOutput> {
        model.validate_band_consistency();
        feedme::write_feedme(model, feedme_path)?;
        self.run(feedme_path).await
    }
}

#[async_trait]
impl FitRunner for GalfitmInvoker {
    async fn run(&self, feedme: &Path) -> Result<RunOutput> {
        GalfitmInvoker::run(self, feedme).await
    }
}
