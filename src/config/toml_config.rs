use crate::adapters::splus::{SplusConfig, DEFAULT_CUTOUT_ENDPOINT, DEFAULT_TAP_ENDPOINT};
use crate::config::DEFAULT_BANDS;
use crate::domain::ports::BatchSettings;
use crate::feedme::BaseKey;
use crate::utils::error::{GalfitError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch: BatchSection,
    #[serde(default)]
    pub survey: SurveySection,
    pub fit: FitSection,
    pub output: OutputSection,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    pub name: String,
    pub description: Option<String>,
    /// Object table (CSV with RA, DEC and ID columns).
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySection {
    #[serde(default = "default_tap_endpoint")]
    pub tap_endpoint: String,
    #[serde(default = "default_cutout_endpoint")]
    pub cutout_endpoint: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub zero_points: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for SurveySection {
    fn default() -> Self {
        Self {
            tap_endpoint: default_tap_endpoint(),
            cutout_endpoint: default_cutout_endpoint(),
            user: None,
            password: None,
            zero_points: None,
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSection {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_components")]
    pub components: Vec<String>,
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
    #[serde(default = "default_cut_size")]
    pub cut_size: u32,
    pub workers: Option<usize>,
    /// Base field overrides keyed by feedme key, e.g. `P = "1"`.
    #[serde(default)]
    pub base: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub data_folder: String,
    pub output_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

fn default_tap_endpoint() -> String {
    DEFAULT_TAP_ENDPOINT.to_string()
}

fn default_cutout_endpoint() -> String {
    DEFAULT_CUTOUT_ENDPOINT.to_string()
}

fn default_executable() -> String {
    "galfitm".to_string()
}

fn default_timeout() -> u64 {
    600
}

fn default_components() -> Vec<String> {
    vec!["sersic".to_string(), "sky".to_string()]
}

fn default_bands() -> Vec<String> {
    DEFAULT_BANDS.split(',').map(str::to_string).collect()
}

fn default_cut_size() -> u32 {
    200
}

impl BatchConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GalfitError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GalfitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` references such as `${SPLUS_PASSWORD}`; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GalfitError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("batch.name", &self.batch.name)?;
        validation::validate_path("batch.table", &self.batch.table)?;
        validation::validate_file_extension("batch.table", &self.batch.table, &["csv"])?;

        validation::validate_url("survey.tap_endpoint", &self.survey.tap_endpoint)?;
        validation::validate_url("survey.cutout_endpoint", &self.survey.cutout_endpoint)?;
        if self.survey.user.is_some() {
            validation::validate_required_field("survey.password", &self.survey.password)?;
        }
        if let Some(zero_points) = &self.survey.zero_points {
            validation::validate_file_extension("survey.zero_points", zero_points, &["csv"])?;
        }

        validation::validate_non_empty_string("fit.executable", &self.fit.executable)?;
        validation::validate_positive_number("fit.timeout_seconds", self.fit.timeout_seconds as usize, 1)?;
        validation::validate_components("fit.components", &self.fit.components)?;
        validation::validate_bands("fit.bands", &self.fit.bands)?;
        validation::validate_positive_number("fit.cut_size", self.fit.cut_size as usize, 1)?;
        if let Some(workers) = self.fit.workers {
            validation::validate_range("fit.workers", workers, 1, 64)?;
        }
        for (key, value) in &self.fit.base {
            key.parse::<BaseKey>()?;
            if value.contains('#') || value.contains('\n') {
                return Err(GalfitError::InvalidConfigValueError {
                    field: format!("fit.base.{}", key),
                    value: value.clone(),
                    reason: "Base values may not contain '#' or line breaks".to_string(),
                });
            }
        }

        validation::validate_feedme_path("output.data_folder", &self.output.data_folder)?;
        validation::validate_feedme_path("output.output_folder", &self.output.output_folder)?;

        Ok(())
    }

    pub fn survey_config(&self) -> SplusConfig {
        SplusConfig {
            tap_endpoint: self.survey.tap_endpoint.clone(),
            cutout_endpoint: self.survey.cutout_endpoint.clone(),
            user: resolved(&self.survey.user),
            password: resolved(&self.survey.password),
            timeout_seconds: self.survey.request_timeout_seconds.unwrap_or(120),
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

/// Drops values still holding an unset `${VAR}` placeholder.
fn resolved(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.is_empty() && !v.starts_with("${"))
        .cloned()
}

impl BatchSettings for BatchConfig {
    fn bands(&self) -> &[String] {
        &self.fit.bands
    }

    fn cut_size(&self) -> u32 {
        self.fit.cut_size
    }

    fn data_folder(&self) -> &str {
        &self.output.data_folder
    }

    fn output_folder(&self) -> &str {
        &self.output.output_folder
    }

    fn executable(&self) -> &str {
        &self.fit.executable
    }

    fn timeout_seconds(&self) -> u64 {
        self.fit.timeout_seconds
    }

    fn components(&self) -> &[String] {
        &self.fit.components
    }

    fn base_overrides(&self) -> Vec<(String, String)> {
        self.fit
            .base
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn workers(&self) -> usize {
        self.fit.workers.unwrap_or(4)
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[batch]
name = "galaxies"
table = "objects.csv"

[fit]

[output]
data_folder = "./data"
output_folder = "./outputs"
"#;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = BatchConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.batch.name, "galaxies");
        assert_eq!(config.fit.executable, "galfitm");
        assert_eq!(config.fit.components, vec!["sersic", "sky"]);
        assert_eq!(config.bands().len(), 12);
        assert_eq!(config.cut_size(), 200);
        assert_eq!(config.workers(), 4);
        assert_eq!(config.survey.tap_endpoint, DEFAULT_TAP_ENDPOINT);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[batch]
name = "fornax"
description = "Fornax cluster dwarfs"
table = "fornax.csv"

[survey]
tap_endpoint = "https://tap.example.org/tap"
cutout_endpoint = "https://cutouts.example.org/cut"
zero_points = "zps.csv"

[fit]
executable = "/opt/galfitm/galfitm-1.4.4"
timeout_seconds = 300
components = ["sersic", "sersic", "sky"]
bands = ["g", "r", "i"]
cut_size = 150
workers = 2

[fit.base]
P = "1"
O = "both"

[output]
data_folder = "./data"
output_folder = "./outputs"

[monitoring]
enabled = true
json_logs = true
"#;

        let config = BatchConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout_seconds(), 300);
        assert_eq!(config.bands(), ["g", "r", "i"]);
        assert_eq!(
            config.base_overrides(),
            vec![
                ("O".to_string(), "both".to_string()),
                ("P".to_string(), "1".to_string())
            ]
        );
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GALFITM_TEST_SPLUS_USER", "astro");

        let toml_content = r#"
[batch]
name = "env"
table = "objects.csv"

[survey]
user = "${GALFITM_TEST_SPLUS_USER}"
password = "${GALFITM_TEST_UNSET_PASSWORD}"

[fit]

[output]
data_folder = "./data"
output_folder = "./outputs"
"#;

        let config = BatchConfig::from_toml_str(toml_content).unwrap();
        let survey = config.survey_config();
        assert_eq!(survey.user.as_deref(), Some("astro"));
        assert_eq!(survey.password, None);

        std::env::remove_var("GALFITM_TEST_SPLUS_USER");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = MINIMAL.replace("[fit]", "[survey]\ntap_endpoint = \"invalid-url\"\n\n[fit]");
        assert!(BatchConfig::from_toml_str(&bad_url).unwrap().validate().is_err());

        let bad_base = MINIMAL.replace("[fit]", "[fit]\n[fit.base]\nQ = \"1\"");
        assert!(matches!(
            BatchConfig::from_toml_str(&bad_base).unwrap().validate(),
            Err(GalfitError::UnknownParameterError { .. })
        ));

        let user_only = MINIMAL.replace("[fit]", "[survey]\nuser = \"astro\"\n\n[fit]");
        assert!(matches!(
            BatchConfig::from_toml_str(&user_only).unwrap().validate(),
            Err(GalfitError::MissingConfigError { .. })
        ));

        let bad_component = MINIMAL.replace("[fit]", "[fit]\ncomponents = [\"blob\"]");
        assert!(BatchConfig::from_toml_str(&bad_component).unwrap().validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = BatchConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.batch.name, "galaxies");
    }
}
