//! Synthetic Moffat PSFs built from the seeing recorded in cutout headers.

use crate::utils::error::{GalfitError, Result};
use crate::utils::fits;
use fitsio::FitsFile;
use std::f64::consts::PI;
use std::path::Path;

pub const DEFAULT_RADIUS: usize = 10;

/// Seeing of one cutout: mean FWHM and Moffat beta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsfParams {
    pub fwhm: f64,
    pub beta: f64,
}

/// Square image of side `2 * radius + 1`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MoffatKernel {
    pub radius: usize,
    pub data: Vec<f64>,
}

impl MoffatKernel {
    pub fn size(&self) -> usize {
        2 * self.radius + 1
    }

    /// Value at pixel offset (`dx`, `dy`) from the centre.
    pub fn at(&self, dx: isize, dy: isize) -> Option<f64> {
        let r = self.radius as isize;
        if dx.abs() > r || dy.abs() > r {
            return None;
        }
        let row = (dy + r) as usize;
        let col = (dx + r) as usize;
        self.data.get(row * self.size() + col).copied()
    }
}

/// Samples a circular Moffat profile on a `(2 * radius + 1)^2` grid.
///
/// `fwhm` is the header seeing; it is converted with the 0.5 factor the
/// survey pipeline uses before computing `alpha`.
pub fn moffat_kernel(fwhm: f64, beta: f64, radius: usize) -> Result<MoffatKernel> {
    if !fwhm.is_finite() || fwhm <= 0.0 {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!("PSF FWHM must be positive, got {}", fwhm),
        });
    }
    if !beta.is_finite() || beta <= 1.0 {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!("Moffat beta must be greater than 1, got {}", beta),
        });
    }

    let fwhm = fwhm / 0.5;
    let alpha = fwhm / (2.0 * ((2f64).powf(1.0 / beta) - 1.0).sqrt());
    let norm = (beta - 1.0) / (PI * alpha * alpha);

    let r = radius as isize;
    let mut data = Vec::with_capacity((2 * radius + 1).pow(2));
    for y in -r..=r {
        for x in -r..=r {
            let rr = ((x * x + y * y) as f64).sqrt() / alpha;
            data.push(norm * (1.0 + rr * rr).powf(-beta));
        }
    }

    Ok(MoffatKernel { radius, data })
}

/// Header keywords holding the seeing, plain or as HIERARCH cards.
pub const FWHM_KEYWORDS: [&str; 2] = ["FWHMMEAN", "OAJ PRO FWHMMEAN"];
pub const BETA_KEYWORDS: [&str; 2] = ["FWHMBETA", "OAJ PRO FWHMBETA"];

/// Reads FWHMMEAN and FWHMBETA from any HDU of a FITS file.
pub fn psf_params_from_header(path: impl AsRef<Path>) -> Result<PsfParams> {
    let mut fptr = fits::open(path.as_ref())?;

    match seeing(&mut fptr) {
        (Some(fwhm), Some(beta)) => Ok(PsfParams { fwhm, beta }),
        _ => Err(GalfitError::FitsError {
            message: format!(
                "{} has no FWHMMEAN/FWHMBETA header keywords",
                path.as_ref().display()
            ),
        }),
    }
}

/// Mean FWHM and Moffat beta of an open file, when present.
pub fn seeing(fptr: &mut FitsFile) -> (Option<f64>, Option<f64>) {
    (
        fits::read_key(fptr, &FWHM_KEYWORDS),
        fits::read_key(fptr, &BETA_KEYWORDS),
    )
}

/// Writes `kernel` as a primary-HDU image, recording the seeing it came from.
pub fn write_psf(path: impl AsRef<Path>, kernel: &MoffatKernel, params: PsfParams) -> Result<()> {
    let size = kernel.size();
    fits::write_image_f64(
        path.as_ref(),
        size,
        size,
        &kernel.data,
        &[
            ("FWHMMEAN", params.fwhm.into()),
            ("FWHMBETA", params.beta.into()),
        ],
    )?;
    tracing::debug!("PSF written to {}", path.as_ref().display());
    Ok(())
}

/// Builds the PSF of a cutout. Explicit `params` win over the header.
pub fn make_psf(
    cutout: impl AsRef<Path>,
    outfile: impl AsRef<Path>,
    params: Option<PsfParams>,
    radius: usize,
) -> Result<PsfParams> {
    let params = match params {
        Some(params) => params,
        None => psf_params_from_header(cutout)?,
    };
    let kernel = moffat_kernel(params.fwhm, params.beta, radius)?;
    write_psf(outfile, &kernel, params)?;
    Ok(params)
}
