//! S-PLUS survey access: catalog photometry through the TAP service and
//! image cutouts, both over plain HTTP.

use crate::domain::model::{BandPhotometry, CutoutInfo, ObjectTarget};
use crate::domain::ports::{CutoutService, SurveyCatalog};
use crate::psf;
use crate::utils::error::{GalfitError, Result};
use crate::utils::fits;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TAP_ENDPOINT: &str = "https://splus.cloud/public-TAP/tap/sync";
pub const DEFAULT_CUTOUT_ENDPOINT: &str = "https://splus.cloud/api/get_cut";

/// Cone radius of the photometry match, in degrees.
pub const MATCH_RADIUS_DEG: f64 = 0.0015;

/// Effective wavelength in Angstrom of every S-PLUS filter.
pub const SPLUS_WAVELENGTHS: [(&str, f64); 12] = [
    ("i", 7670.59),
    ("r", 6251.83),
    ("g", 4758.49),
    ("z", 8936.64),
    ("u", 3533.29),
    ("J0378", 3773.13),
    ("J0395", 3940.70),
    ("J0410", 4095.27),
    ("J0430", 4292.39),
    ("J0515", 5133.15),
    ("J0660", 6613.88),
    ("J0861", 8607.59),
];

/// Case-insensitive lookup in [`SPLUS_WAVELENGTHS`].
pub fn wavelength(band: &str) -> Option<f64> {
    SPLUS_WAVELENGTHS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(band))
        .map(|(_, wl)| *wl)
}

/// Sorts by effective wavelength; bands without one keep their order at the end.
pub fn sort_bands_by_wavelength(bands: &[String]) -> Vec<String> {
    let mut sorted = bands.to_vec();
    sorted.sort_by(|a, b| match (wavelength(a), wavelength(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted
}

#[derive(Debug, Clone)]
pub struct SplusConfig {
    pub tap_endpoint: String,
    pub cutout_endpoint: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SplusConfig {
    fn default() -> Self {
        Self {
            tap_endpoint: DEFAULT_TAP_ENDPOINT.to_string(),
            cutout_endpoint: DEFAULT_CUTOUT_ENDPOINT.to_string(),
            user: None,
            password: None,
            timeout_seconds: 120,
        }
    }
}

pub struct SplusClient {
    client: Client,
    config: SplusConfig,
}

impl SplusClient {
    pub fn new(config: SplusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(user, self.config.password.as_ref()),
            None => request,
        }
    }

    /// Runs a synchronous ADQL query and returns the CSV result as
    /// (header, rows).
    pub async fn query(&self, adql: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        tracing::debug!("📡 TAP query to {}: {}", self.config.tap_endpoint, adql.trim());

        let request = self.client.get(&self.config.tap_endpoint).query(&[
            ("REQUEST", "doQuery"),
            ("LANG", "ADQL"),
            ("FORMAT", "csv"),
            ("QUERY", adql),
        ]);
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GalfitError::QueryError {
                message: format!("TAP service answered {}: {}", status, first_line(&body)),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(body.as_bytes());
        let header = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok((header, rows))
    }

    async fn band_photometry(&self, target: &ObjectTarget, band: &str) -> Result<BandPhotometry> {
        let (header, rows) = self.query(&photometry_query(target.ra, target.dec, band)).await?;
        let row = rows.first().ok_or_else(|| GalfitError::QueryError {
            message: format!(
                "no {} band source within {} deg of ({}, {})",
                band, MATCH_RADIUS_DEG, target.ra, target.dec
            ),
        })?;

        let b = band.to_lowercase();
        let value = |column: String| -> Result<f64> {
            let index = header
                .iter()
                .position(|h| h.eq_ignore_ascii_case(&column))
                .ok_or_else(|| GalfitError::QueryError {
                    message: format!("column {} missing from TAP result", column),
                })?;
            let raw = row.get(index).map(String::as_str).unwrap_or_default();
            raw.trim().parse().map_err(|_| GalfitError::QueryError {
                message: format!("column {} is not numeric: {:?}", column, raw),
            })
        };

        let a = value(format!("A_{}", b))?;
        let b_axis = value(format!("B_{}", b))?;
        if a == 0.0 {
            return Err(GalfitError::QueryError {
                message: format!("semi-major axis A_{} is zero", b),
            });
        }

        Ok(BandPhotometry {
            band: band.to_string(),
            axis_ratio: b_axis / a,
            effective_radius: value(format!("FLUX_RADIUS_50_{}", b))?,
            position_angle: value(format!("THETA_{}", b))?,
            magnitude: value(format!("{}_auto", b))?,
        })
    }
}

/// Cone search on the single-band catalog of `band`.
pub fn photometry_query(ra: f64, dec: f64, band: &str) -> String {
    let b = band.to_lowercase();
    format!(
        "SELECT * FROM \"idr4_single\".\"idr4_single_{b}\" AS x \
         WHERE 1 = CONTAINS(POINT('ICRS', x.ra_{b}, x.dec_{b}), \
         CIRCLE('ICRS', {ra}, {dec}, {radius}))",
        b = b,
        ra = ra,
        dec = dec,
        radius = MATCH_RADIUS_DEG
    )
}

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or_default()
}

#[async_trait]
impl SurveyCatalog for SplusClient {
    async fn photometry(
        &self,
        target: &ObjectTarget,
        bands: &[String],
    ) -> Result<Vec<BandPhotometry>> {
        let mut photometry = Vec::with_capacity(bands.len());
        for band in bands {
            photometry.push(self.band_photometry(target, band).await?);
        }
        Ok(photometry)
    }
}

/// Survey field (OBJECT, else FIELD) and seeing of a downloaded cutout.
fn read_cutout_header(path: &Path) -> Result<(Option<String>, Option<f64>, Option<f64>)> {
    let mut fptr = fits::open(path)?;
    let field = fits::read_key::<String>(&mut fptr, &["OBJECT", "FIELD"])
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let (fwhm_mean, fwhm_beta) = psf::seeing(&mut fptr);
    Ok((field, fwhm_mean, fwhm_beta))
}

#[async_trait]
impl CutoutService for SplusClient {
    async fn fetch_cutout(
        &self,
        target: &ObjectTarget,
        band: &str,
        size: u32,
        dest: &Path,
    ) -> Result<CutoutInfo> {
        tracing::debug!("📥 Cutout {} band {} ({} px)", target.name, band, size);

        let request = self.client.get(&self.config.cutout_endpoint).query(&[
            ("ra", target.ra.to_string()),
            ("dec", target.dec.to_string()),
            ("size", size.to_string()),
            ("band", band.to_string()),
        ]);
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GalfitError::QueryError {
                message: format!("cutout service answered {}: {}", status, first_line(&body)),
            });
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // checked as FITS before it takes the final name
        let partial = dest.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        let checked = partial.clone();
        let header = tokio::task::spawn_blocking(move || read_cutout_header(&checked))
            .await
            .map_err(std::io::Error::from)?;
        let (field, fwhm_mean, fwhm_beta) = match header {
            Ok(header) => header,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, dest).await?;

        Ok(CutoutInfo {
            band: band.to_string(),
            path: dest.to_path_buf(),
            field,
            fwhm_mean,
            fwhm_beta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_bands_by_wavelength() {
        let bands: Vec<String> = ["i", "J0660", "g", "custom", "u"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            sort_bands_by_wavelength(&bands),
            vec!["u", "g", "J0660", "i", "custom"]
        );
    }

    #[test]
    fn test_wavelength_lookup() {
        assert_eq!(wavelength("r"), Some(6251.83));
        assert_eq!(wavelength("j0378"), Some(3773.13));
        assert_eq!(wavelength("Y"), None);
    }

    #[test]
    fn test_photometry_query() {
        let adql = photometry_query(54.3, -35.1, "J0660");
        assert!(adql.contains("\"idr4_single\".\"idr4_single_j0660\""));
        assert!(adql.contains("x.ra_j0660, x.dec_j0660"));
        assert!(adql.contains("CIRCLE('ICRS', 54.3, -35.1, 0.0015)"));
    }
}
