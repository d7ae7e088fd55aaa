use super::model::Model;
use super::schema::ParamKey;
use std::fmt;

/// A per-parameter inconsistency between a value list, the declared bands
/// and the degrees-of-freedom column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandWarning {
    pub component: String,
    pub param: ParamKey,
    pub values: usize,
    pub bands: usize,
    pub problems: Vec<String>,
}

impl fmt::Display for BandWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parameter {}: {} values for {} bands ({})",
            self.component,
            self.param,
            self.values,
            self.bands,
            self.problems.join("; ")
        )
    }
}

/// Collects at most one warning per (component, parameter) pair.
///
/// Only multi-valued `col1` entries are checked: their length must equal the
/// band count declared in `A1`, and must not be below the integer in `col2`.
pub fn band_warnings(model: &Model) -> Vec<BandWarning> {
    let bands = model.band_count();
    let mut warnings = Vec::new();

    for component in model.active_instances() {
        for (key, slot) in &component.params {
            let values = slot.values().len();
            let mut problems = Vec::new();

            if values > 1 {
                if values != bands {
                    problems.push(format!("expected {} values", bands));
                }
                let dof = slot.col2.trim();
                if !dof.is_empty() {
                    match dof.parse::<usize>() {
                        Ok(dof) if values < dof => {
                            problems.push(format!("fewer values than {} degrees of freedom", dof))
                        }
                        Ok(_) => {}
                        Err(_) => problems.push(format!("col2 {:?} is not an integer", dof)),
                    }
                }
            }

            if !problems.is_empty() {
                warnings.push(BandWarning {
                    component: component.name.clone(),
                    param: *key,
                    values,
                    bands,
                    problems,
                });
            }
        }
    }

    warnings
}

/// Logs every [`BandWarning`] and reports whether the model is consistent.
/// Never fails: the check is advisory.
pub fn validate_band_consistency(model: &Model) -> bool {
    let warnings = band_warnings(model);
    for warning in &warnings {
        tracing::warn!("⚠️ Band consistency: {}", warning);
    }
    warnings.is_empty()
}
