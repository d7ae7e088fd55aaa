use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One row of the input object table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTarget {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
}

/// Catalog measurements of one object in one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPhotometry {
    pub band: String,
    /// b/a
    pub axis_ratio: f64,
    /// Half-light radius in pixels.
    pub effective_radius: f64,
    pub position_angle: f64,
    pub magnitude: f64,
}

/// A downloaded cutout and the header metadata needed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutInfo {
    pub band: String,
    pub path: PathBuf,
    /// Survey field the cutout was taken from, used for zero-point lookup.
    pub field: Option<String>,
    pub fwhm_mean: Option<f64>,
    pub fwhm_beta: Option<f64>,
}

/// Captured output of a successful GalfitM run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// One row of a result table, columns in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    columns: Vec<(String, String)>,
}

impl ResultRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing the value if the column already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
