//! Line scanner for feedme files, including the files GalfitM writes back
//! after a fit (`*.galfit.01.band`).
//!
//! The scan has two states: the base section, which lasts until the first
//! `0)` component header, and the component section. Once a component has
//! been seen no further base lines are expected.

use super::model::Model;
use super::schema::{BaseField, BaseKey, ComponentKind, ParamKey, ParameterSlot};
use crate::utils::error::{GalfitError, Result};
use std::path::Path;

/// Keys longer than this are taken to be prose and skipped. This is a
/// heuristic for the free text GalfitM puts around its echoed parameters,
/// not part of the grammar.
const MAX_KEY_LEN: usize = 3;

/// A component line needs the key, col1 and at least two more segments
/// (further columns or the comment).
const MIN_COMPONENT_SEGMENTS: usize = 4;

pub fn parse(text: &str) -> Result<Model> {
    let mut model = Model::empty();
    let mut in_base = true;
    let mut current_component = String::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let first_token = line.split_whitespace().next().unwrap_or_default();
        let (key, rest) = match first_token.find(')') {
            Some(pos) => (&first_token[..pos], &line[pos + 1..]),
            None => (first_token, ""),
        };

        if key.starts_with('#') || key.chars().count() > MAX_KEY_LEN {
            continue;
        }
        if !first_token.contains(')') {
            return Err(malformed(line_no, raw, "expected `KEY)` at the start of the line"));
        }
        if key.is_empty() {
            return Err(malformed(line_no, raw, "empty key before `)`"));
        }

        if key == "0" {
            let type_name = rest
                .split_whitespace()
                .next()
                .filter(|name| !name.starts_with('#'))
                .ok_or_else(|| malformed(line_no, raw, "component header without a type name"))?;
            let kind: ComponentKind = type_name.parse()?;

            current_component = model.push_parsed_component(kind);
            in_base = false;
            tracing::trace!("line {}: component block {}", line_no, current_component);
            continue;
        }

        if in_base {
            let (value, comment) = split_comment(rest);
            match key.parse::<BaseKey>() {
                Ok(base_key) => model.insert_base_field(
                    base_key,
                    BaseField {
                        value: value.to_string(),
                        comment: comment.to_string(),
                    },
                ),
                Err(_) => tracing::debug!("line {}: skipping unknown base key {}", line_no, key),
            }
            continue;
        }

        if line.split_whitespace().count() < MIN_COMPONENT_SEGMENTS {
            return Err(malformed(
                line_no,
                raw,
                &format!(
                    "component line needs at least {} whitespace-separated segments",
                    MIN_COMPONENT_SEGMENTS
                ),
            ));
        }

        let (columns, comment) = split_comment(rest);
        let columns: Vec<&str> = columns.split_whitespace().collect();
        if columns.is_empty() {
            return Err(malformed(line_no, raw, "missing value column"));
        }
        if columns.len() > 3 {
            return Err(malformed(line_no, raw, "more than three value columns"));
        }

        let param_key = match key.parse::<ParamKey>() {
            Ok(param_key) => param_key,
            Err(_) => {
                tracing::debug!(
                    "line {}: skipping unknown parameter {} of {}",
                    line_no,
                    key,
                    current_component
                );
                continue;
            }
        };

        let column = |i: usize| columns.get(i).copied().unwrap_or_default();
        model.insert_parsed_slot(
            &current_component,
            param_key,
            ParameterSlot::new(column(0), column(1), column(2), comment),
        );
    }

    Ok(model)
}

pub fn read_feedme(path: impl AsRef<Path>) -> Result<Model> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse(&text)
}

/// Splits `value # comment` at the first `#`, trimming both sides.
fn split_comment(s: &str) -> (&str, &str) {
    match s.find('#') {
        Some(pos) => (
            s[..pos].trim(),
            s[pos + 1..].trim_start_matches('#').trim(),
        ),
        None => (s.trim(), ""),
    }
}

fn malformed(line: usize, content: &str, reason: &str) -> GalfitError {
    GalfitError::MalformedRecordError {
        line,
        content: content.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALFITM_OUTPUT: &str = "
===============================================================================
# IMAGE and GALFIT CONTROL PARAMETERS
A) ngc1.fits,ngc2.fits,ngc3.fits      # Input data image (FITS file)
A1) g,r,i                # Nick names (band labels)
A3) 1,1,1                # Band weights
B) outss.fits            # Output data image block
J) 23.1,23.4,23.2        # Magnitude photometric zeropoint

# INITIAL FITTING PARAMETERS
#   Object number: 1
 0) sersic                 #  Component type
 1) 101.2,101.2,101.2      1  band  #  Position x [pixel]
 3) 14.52,14.01,13.77      3  band  #  Integrated magnitude
 5) 3.10,3.10,3.10         2  band  #  Sersic index n (de Vaucouleurs n=4)
 Z) 0                               #  Skip this model in output image?  (yes=1, no=0)

#   Object number: 2
 0) sky                    #  Component type
 1) 0.12,0.08,0.05         0  band  #  Sky background at center of fitting region [ADUs]

================================================================================
";

    #[test]
    fn test_parses_galfitm_output_block() {
        let model = parse(GALFITM_OUTPUT).unwrap();

        assert_eq!(model.base_value(BaseKey::A1), Some("g,r,i"));
        assert_eq!(model.base_value(BaseKey::J), Some("23.1,23.4,23.2"));
        // fields the tool did not echo are absent
        assert!(model.base_field(BaseKey::H).is_none());
        assert_eq!(model.active_components(), &["sersic", "sky"]);

        let sersic = model.component("sersic").unwrap();
        assert_eq!(sersic.params[&ParamKey::P3].col1, "14.52,14.01,13.77");
        assert_eq!(sersic.params[&ParamKey::P3].col2, "3");
        assert_eq!(sersic.params[&ParamKey::P3].col3, "band");
        assert_eq!(
            sersic.params[&ParamKey::Z],
            ParameterSlot::new("0", "", "", "Skip this model in output image?  (yes=1, no=0)")
        );
    }

    #[test]
    fn test_repeated_headers_get_suffixes() {
        let text = "A1) g # bands\n0) sersic\n3) 1 3 band # m\n0) sersic\n3) 2 3 band # m\n0) sersic\n3) 3 3 band # m\n";
        let model = parse(text).unwrap();

        assert_eq!(model.active_components(), &["sersic", "sersic1", "sersic2"]);
        assert_eq!(model.component("sersic2").unwrap().params[&ParamKey::P3].col1, "3");
    }

    #[test]
    fn test_short_component_line_is_malformed() {
        let text = "A1) g,r,i # bands\n0) sersic\n3) 10,11,12 3\n";
        let err = parse(text).unwrap_err();

        match err {
            GalfitError::MalformedRecordError { line, content, .. } => {
                assert_eq!(line, 3);
                assert_eq!(content, "3) 10,11,12 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_line_without_paren_is_malformed() {
        let err = parse("A1) g # bands\nB outss.fits # Output\n").unwrap_err();
        assert!(matches!(err, GalfitError::MalformedRecordError { line: 2, .. }));
    }

    #[test]
    fn test_unknown_component_type_fails() {
        let err = parse("0) viking\n1) 1 1 band # x\n").unwrap_err();
        assert!(matches!(err, GalfitError::UnknownComponentError { .. }));
    }

    #[test]
    fn test_prose_lines_are_skipped() {
        let text = "Fitting results follow\nA) img.fits # Input\n#  comment line\n";
        let model = parse(text).unwrap();
        assert_eq!(model.base_value(BaseKey::A), Some("img.fits"));
    }
}
