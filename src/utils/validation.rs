use crate::utils::error::{GalfitError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> GalfitError {
    GalfitError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

/// Paths end up in feedme base values, where `#` starts a comment.
pub fn validate_feedme_path(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;
    if path.contains('#') {
        return Err(invalid(
            field_name,
            path,
            "Path may not contain '#': GalfitM would read the rest as a comment",
        ));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed.contains(extension.to_ascii_lowercase().as_str()) => Ok(()),
        Some(extension) => Err(invalid(
            field_name,
            file,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        )),
        None => Err(invalid(
            field_name,
            file,
            "File has no extension or invalid filename",
        )),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| GalfitError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Band labels: at least one, no blanks, no duplicates, no commas.
pub fn validate_bands(field_name: &str, bands: &[String]) -> Result<()> {
    if bands.is_empty() {
        return Err(invalid(field_name, "", "At least one band is required"));
    }

    let mut seen = HashSet::new();
    for band in bands {
        if band.trim().is_empty() || band.contains(',') || band.contains('#') {
            return Err(invalid(field_name, band, "Band labels must be plain names"));
        }
        if !seen.insert(band.as_str()) {
            return Err(invalid(field_name, band, "Duplicate band"));
        }
    }
    Ok(())
}

/// Component names must be registered types.
pub fn validate_components(field_name: &str, components: &[String]) -> Result<()> {
    if components.is_empty() {
        return Err(invalid(field_name, "", "At least one component is required"));
    }
    for name in components {
        name.parse::<crate::feedme::ComponentKind>()
            .map_err(|_| invalid(field_name, name, "Unknown component type"))?;
    }
    Ok(())
}
