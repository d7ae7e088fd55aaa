pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::adapters::splus::{SplusConfig, DEFAULT_CUTOUT_ENDPOINT, DEFAULT_TAP_ENDPOINT};
#[cfg(feature = "cli")]
use crate::domain::ports::BatchSettings;
use crate::feedme::BaseKey;
use crate::utils::error::{GalfitError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

/// Bands in order of increasing effective wavelength.
pub const DEFAULT_BANDS: &str = "u,J0378,J0395,J0410,J0430,g,J0515,r,J0660,i,J0861,z";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "galfitm-feedme")]
#[command(about = "Fit every object of a table with GalfitM using S-PLUS cutouts")]
pub struct CliConfig {
    #[arg(help = "CSV table with RA, DEC and ID columns")]
    pub table_path: String,

    #[arg(short = 'C', long, default_value = "200", help = "Box size of the images")]
    pub cut_size: u32,

    #[arg(short = 'b', long, value_delimiter = ',', default_value = DEFAULT_BANDS)]
    pub bands: Vec<String>,

    #[arg(short = 'F', long, default_value = "../data/")]
    pub data_folder: String,

    #[arg(short = 'O', long, default_value = "../outputs/")]
    pub output_folder: String,

    #[arg(short = 'G', long, default_value = "galfitm", help = "Path to the GalfitM executable")]
    pub galfit_path: String,

    #[arg(long, default_value = "600")]
    pub timeout_secs: u64,

    #[arg(short = 'U', long, env = "SPLUS_USER")]
    pub splus_user: Option<String>,

    #[arg(short = 'P', long, env = "SPLUS_PASSWORD", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub splus_password: Option<String>,

    #[arg(long, default_value = DEFAULT_TAP_ENDPOINT)]
    pub tap_endpoint: String,

    #[arg(long, default_value = DEFAULT_CUTOUT_ENDPOINT)]
    pub cutout_endpoint: String,

    #[arg(long, help = "CSV of zero points with field, band and zp columns")]
    pub zero_points: Option<String>,

    #[arg(long, value_delimiter = ',', default_value = "sersic,sky")]
    pub components: Vec<String>,

    #[arg(long = "base", help = "Base field override such as P=1 (repeatable)")]
    pub base: Vec<String>,

    #[arg(long, default_value = "4")]
    pub workers: usize,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory between objects")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn survey_config(&self) -> SplusConfig {
        SplusConfig {
            tap_endpoint: self.tap_endpoint.clone(),
            cutout_endpoint: self.cutout_endpoint.clone(),
            user: self.splus_user.clone(),
            password: self.splus_password.clone(),
            timeout_seconds: 120,
        }
    }
}

/// Splits `KEY=VALUE` and checks the key against the base schema.
pub fn parse_base_override(entry: &str) -> Result<(String, String)> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| GalfitError::InvalidConfigValueError {
            field: "base".to_string(),
            value: entry.to_string(),
            reason: "Expected KEY=VALUE".to_string(),
        })?;
    let key = key.trim();
    key.parse::<BaseKey>()?;
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(feature = "cli")]
impl BatchSettings for CliConfig {
    fn bands(&self) -> &[String] {
        &self.bands
    }

    fn cut_size(&self) -> u32 {
        self.cut_size
    }

    fn data_folder(&self) -> &str {
        &self.data_folder
    }

    fn output_folder(&self) -> &str {
        &self.output_folder
    }

    fn executable(&self) -> &str {
        &self.galfit_path
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_secs
    }

    fn components(&self) -> &[String] {
        &self.components
    }

    fn base_overrides(&self) -> Vec<(String, String)> {
        // invalid entries were already rejected by validate()
        self.base
            .iter()
            .filter_map(|entry| parse_base_override(entry).ok())
            .collect()
    }

    fn workers(&self) -> usize {
        self.workers
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("table_path", &self.table_path)?;
        validation::validate_file_extension("table_path", &self.table_path, &["csv"])?;
        validation::validate_positive_number("cut_size", self.cut_size as usize, 1)?;
        validation::validate_bands("bands", &self.bands)?;
        validation::validate_components("components", &self.components)?;
        validation::validate_feedme_path("data_folder", &self.data_folder)?;
        validation::validate_feedme_path("output_folder", &self.output_folder)?;
        validation::validate_non_empty_string("galfit_path", &self.galfit_path)?;
        validation::validate_positive_number("timeout_secs", self.timeout_secs as usize, 1)?;
        validation::validate_range("workers", self.workers, 1, 64)?;
        validation::validate_url("tap_endpoint", &self.tap_endpoint)?;
        validation::validate_url("cutout_endpoint", &self.cutout_endpoint)?;

        if let Some(zero_points) = &self.zero_points {
            validation::validate_file_extension("zero_points", zero_points, &["csv"])?;
        }
        for entry in &self.base {
            parse_base_override(entry)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        let mut argv = vec!["galfitm-feedme"];
        argv.extend_from_slice(args);
        CliConfig::parse_from(argv)
    }

    #[test]
    fn test_defaults_follow_survey_layout() {
        let config = parse(&["objects.csv"]);
        assert_eq!(config.cut_size, 200);
        assert_eq!(config.bands.len(), 12);
        assert_eq!(config.bands.first().map(String::as_str), Some("u"));
        assert_eq!(config.components, vec!["sersic", "sky"]);
        assert_eq!(config.data_folder, "../data/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_overrides() {
        let config = parse(&["objects.csv", "--base", "P=1", "--base", "E=2"]);
        assert_eq!(
            config.base_overrides(),
            vec![
                ("P".to_string(), "1".to_string()),
                ("E".to_string(), "2".to_string())
            ]
        );

        let bad = parse(&["objects.csv", "--base", "Q=1"]);
        assert!(matches!(
            bad.validate(),
            Err(GalfitError::UnknownParameterError { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(parse(&["objects.txt"]).validate().is_err());
        assert!(parse(&["objects.csv", "--bands", "g,g"]).validate().is_err());
        assert!(parse(&["objects.csv", "--components", "blob"]).validate().is_err());
        assert!(parse(&["objects.csv", "--workers", "0"]).validate().is_err());
        assert!(parse(&["objects.csv", "-O", "out#1"]).validate().is_err());
    }
}
