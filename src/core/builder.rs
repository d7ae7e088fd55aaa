//! Builds the feedme model of one object from survey inputs.

use crate::adapters::splus;
use crate::domain::model::{BandPhotometry, CutoutInfo, ObjectTarget};
use crate::domain::ports::BatchSettings;
use crate::feedme::{BaseKey, ComponentKind, Model, ParamKey};
use crate::utils::error::{GalfitError, Result};
use std::path::{Path, PathBuf};

/// Plate scale of S-PLUS images in arcsec per pixel.
pub const PLATE_SCALE: &str = "0.55  0.55";

/// Per-object inputs, each list in any band order.
#[derive(Debug, Clone)]
pub struct FitInputs {
    pub target: ObjectTarget,
    pub photometry: Vec<BandPhotometry>,
    pub cutouts: Vec<CutoutInfo>,
    /// (band, PSF file)
    pub psfs: Vec<(String, PathBuf)>,
    /// Zero point per band, in band order.
    pub zero_points: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FeedmeBuilder {
    bands: Vec<String>,
    cut_size: u32,
    components: Vec<String>,
    base_overrides: Vec<(String, String)>,
}

/// `<name>ss.fits`, the image block GalfitM writes.
pub fn output_image_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{}ss.fits", name))
}

/// Per-band results GalfitM writes next to the image block.
pub fn output_band_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{}ss.galfit.01.band", name))
}

fn joined<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl FeedmeBuilder {
    pub fn new(bands: Vec<String>, cut_size: u32) -> Self {
        Self {
            bands,
            cut_size,
            components: vec!["sersic".to_string(), "sky".to_string()],
            base_overrides: Vec::new(),
        }
    }

    pub fn from_settings(settings: &dyn BatchSettings) -> Self {
        Self {
            bands: settings.bands().to_vec(),
            cut_size: settings.cut_size(),
            components: settings.components().to_vec(),
            base_overrides: settings.base_overrides(),
        }
    }

    pub fn with_components(mut self, components: Vec<String>) -> Self {
        self.components = components;
        self
    }

    pub fn with_base_overrides(mut self, overrides: Vec<(String, String)>) -> Self {
        self.base_overrides = overrides;
        self
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn build(&self, inputs: &FitInputs, output_dir: &Path) -> Result<Model> {
        let name = &inputs.target.name;
        let n = self.bands.len();
        if inputs.zero_points.len() != n {
            return Err(GalfitError::InvalidArgumentError {
                reason: format!("{} zero points for {} bands", inputs.zero_points.len(), n),
            });
        }

        let mut images = Vec::with_capacity(n);
        let mut psfs = Vec::with_capacity(n);
        let mut wavelengths = Vec::with_capacity(n);
        let mut photometry = Vec::with_capacity(n);
        for band in &self.bands {
            let cutout = inputs
                .cutouts
                .iter()
                .find(|c| c.band.eq_ignore_ascii_case(band))
                .ok_or_else(|| missing_input("cutout", band))?;
            let psf = inputs
                .psfs
                .iter()
                .find(|(b, _)| b.eq_ignore_ascii_case(band))
                .ok_or_else(|| missing_input("PSF", band))?;
            let phot = inputs
                .photometry
                .iter()
                .find(|p| p.band.eq_ignore_ascii_case(band))
                .ok_or_else(|| missing_input("photometry", band))?;
            let wl = splus::wavelength(band).ok_or_else(|| GalfitError::InvalidArgumentError {
                reason: format!("band {} has no known effective wavelength", band),
            })?;

            images.push(cutout.path.display().to_string());
            psfs.push(psf.1.display().to_string());
            wavelengths.push(wl);
            photometry.push(phot);
        }

        let size = self.cut_size;
        let mut model = Model::new().with_name(name.as_str());
        model.set_base_values([
            (BaseKey::A, images.join(",")),
            (BaseKey::A1, self.bands.join(",")),
            (BaseKey::A2, joined(&wavelengths)),
            (BaseKey::B, output_image_path(output_dir, name).display().to_string()),
            (BaseKey::C, "none".to_string()),
            (BaseKey::D, psfs.join(",")),
            (BaseKey::H, format!("1    {}  1  {}", size, size)),
            (BaseKey::I, format!("{}  {}", size, size)),
            (BaseKey::J, joined(&inputs.zero_points)),
            (BaseKey::K, PLATE_SCALE.to_string()),
        ])?;
        for (key, value) in &self.base_overrides {
            model.set_base_value_by_name(key, value)?;
        }

        let instances = model.activate_components(&self.components)?;
        for instance in &instances {
            fit_to_band_count(&mut model, instance, n)?;
        }

        let centre = format!("{:.1}", size as f64 / 2.0);
        for instance in &instances {
            let Some(kind) = model.component(instance).map(|c| c.kind) else {
                continue;
            };
            if kind != ComponentKind::Sersic {
                continue;
            }
            model.set_component_values(
                instance,
                [
                    (ParamKey::P1, joined(std::iter::repeat(&centre).take(n))),
                    (ParamKey::P2, joined(std::iter::repeat(&centre).take(n))),
                    (ParamKey::P3, joined(photometry.iter().map(|p| p.magnitude))),
                    (ParamKey::P4, joined(photometry.iter().map(|p| p.effective_radius))),
                    (ParamKey::P9, joined(photometry.iter().map(|p| p.axis_ratio))),
                    (ParamKey::P10, joined(photometry.iter().map(|p| p.position_angle))),
                ],
                1,
            )?;
        }

        tracing::debug!(
            "Built feedme for {} with {} bands and components {:?}",
            name,
            n,
            instances
        );
        Ok(model)
    }
}

fn missing_input(what: &str, band: &str) -> GalfitError {
    GalfitError::InvalidArgumentError {
        reason: format!("no {} for band {}", what, band),
    }
}

/// Template defaults are written for three bands. Multi-valued defaults are
/// broadcast from their first value and degrees of freedom are capped at the
/// band count.
fn fit_to_band_count(model: &mut Model, instance: &str, n: usize) -> Result<()> {
    let Some(component) = model.component(instance) else {
        return Ok(());
    };

    let mut values = Vec::new();
    let mut dofs = Vec::new();
    for (key, slot) in &component.params {
        if slot.col3 != "band" {
            continue;
        }
        let split = slot.values();
        if split.len() > 1 && split.len() != n {
            let first = split.first().copied().unwrap_or("0");
            values.push((*key, joined(std::iter::repeat(first).take(n))));
        }
        if let Ok(dof) = slot.col2.parse::<usize>() {
            if dof > n {
                dofs.push((*key, n.to_string()));
            }
        }
    }

    model.set_component_values(instance, values, 1)?;
    model.set_component_values(instance, dofs, 2)?;
    Ok(())
}
