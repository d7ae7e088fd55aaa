//! FITS access through cfitsio: header keywords of survey cutouts and
//! single 2-D `f64` images for the synthetic PSFs.

use crate::utils::error::{GalfitError, Result};
use fitsio::headers::ReadsKey;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use std::path::Path;

/// Value of an extra header keyword written with an image.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Text(String),
    Float(f64),
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<f64> for KeyValue {
    fn from(value: f64) -> Self {
        KeyValue::Float(value)
    }
}

fn fits_error(path: &Path, e: fitsio::errors::Error) -> GalfitError {
    GalfitError::FitsError {
        message: format!("{}: {}", path.display(), e),
    }
}

pub fn open(path: impl AsRef<Path>) -> Result<FitsFile> {
    let path = path.as_ref();
    FitsFile::open(path).map_err(|e| fits_error(path, e))
}

/// First of `keywords` found in any HDU, in file order.
///
/// Compressed cutouts keep their header in extension 1, so every HDU is
/// searched. HIERARCH keywords are given without the `HIERARCH` prefix.
pub fn read_key<T: ReadsKey>(fptr: &mut FitsFile, keywords: &[&str]) -> Option<T> {
    let mut index = 0;
    while let Ok(hdu) = fptr.hdu(index) {
        for keyword in keywords {
            if let Ok(value) = hdu.read_key::<T>(fptr, keyword) {
                return Some(value);
            }
        }
        index += 1;
    }
    None
}

/// Writes a single-HDU file holding a `width` x `height` image, row-major
/// with x varying fastest. An existing file is replaced.
pub fn write_image_f64(
    path: impl AsRef<Path>,
    width: usize,
    height: usize,
    data: &[f64],
    extra_keys: &[(&str, KeyValue)],
) -> Result<()> {
    let path = path.as_ref();
    if data.len() != width * height {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!(
                "image data has {} pixels, expected {}x{}",
                data.len(),
                width,
                height
            ),
        });
    }

    // cfitsio refuses to overwrite
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[height, width],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .map_err(|e| fits_error(path, e))?;
    let hdu = fptr.primary_hdu().map_err(|e| fits_error(path, e))?;

    hdu.write_image(&mut fptr, data)
        .map_err(|e| fits_error(path, e))?;
    for (keyword, value) in extra_keys {
        let written = match value {
            KeyValue::Text(text) => hdu.write_key(&mut fptr, keyword, text.as_str()),
            KeyValue::Float(number) => hdu.write_key(&mut fptr, keyword, *number),
        };
        written.map_err(|e| fits_error(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_written_image_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("psf.fits");
        let data: Vec<f64> = (0..6).map(f64::from).collect();

        write_image_f64(
            &path,
            3,
            2,
            &data,
            &[("OBJECT", "SPLUS-s28s33".into()), ("FWHMBETA", 2.5.into())],
        )
        .unwrap();

        let mut fptr = open(&path).unwrap();
        assert_eq!(read_key::<i64>(&mut fptr, &["NAXIS1"]), Some(3));
        assert_eq!(read_key::<i64>(&mut fptr, &["NAXIS2"]), Some(2));
        assert_eq!(read_key::<f64>(&mut fptr, &["FWHMBETA"]), Some(2.5));
        assert_eq!(
            read_key::<String>(&mut fptr, &["FIELD", "OBJECT"]).as_deref(),
            Some("SPLUS-s28s33")
        );

        let hdu = fptr.primary_hdu().unwrap();
        let pixels: Vec<f64> = hdu.read_image(&mut fptr).unwrap();
        assert_eq!(pixels, data);
    }

    #[test]
    fn test_rewriting_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("psf.fits");
        write_image_f64(&path, 1, 1, &[1.0], &[]).unwrap();
        write_image_f64(&path, 2, 1, &[1.0, 2.0], &[]).unwrap();

        let mut fptr = open(&path).unwrap();
        assert_eq!(read_key::<i64>(&mut fptr, &["NAXIS1"]), Some(2));
        assert_eq!(read_key::<f64>(&mut fptr, &["FWHMMEAN"]), None);
    }

    #[test]
    fn test_invalid_files_are_errors() {
        let dir = TempDir::new().unwrap();

        let html = dir.path().join("cut.fits");
        std::fs::write(&html, "<html>maintenance</html>").unwrap();
        assert!(matches!(open(&html), Err(GalfitError::FitsError { .. })));

        // a header claiming an absurd data size
        let mut header = String::new();
        for card in [
            "SIMPLE  =                    T",
            "BITPIX  =                  -64",
            "NAXIS   =                    2",
            "NAXIS1  =  9223372036854775807",
            "NAXIS2  =  9223372036854775807",
            "END",
        ] {
            header.push_str(&format!("{:<80}", card));
        }
        header.push_str(&" ".repeat(2880 - header.len()));
        let corrupt = dir.path().join("corrupt.fits");
        std::fs::write(&corrupt, header).unwrap();
        let seeing = open(&corrupt).map(|mut fptr| read_key::<f64>(&mut fptr, &["FWHMMEAN"]));
        assert!(!matches!(seeing, Ok(Some(_))));

        assert!(matches!(
            write_image_f64(dir.path().join("x.fits"), 2, 2, &[1.0], &[]),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
    }
}
