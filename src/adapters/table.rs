//! CSV inputs of a batch run: the object table and the zero-point table.

use crate::domain::model::ObjectTarget;
use crate::utils::error::{GalfitError, Result};
use std::collections::HashMap;

/// Names of the RA, DEC and ID columns, matched by lowercase substring.
/// Later columns win, so `ra_deg` after `rank` is picked.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLabels {
    pub ra: usize,
    pub dec: usize,
    pub id: usize,
}

pub fn column_labels(headers: &csv::StringRecord) -> Result<ColumnLabels> {
    let mut ra = None;
    let mut dec = None;
    let mut id = None;

    for (index, name) in headers.iter().enumerate() {
        let lower = name.to_lowercase();
        if lower.contains("dec") {
            dec = Some(index);
        }
        if lower.contains("ra") {
            ra = Some(index);
        }
        if lower.contains("id") {
            id = Some(index);
        }
    }

    let missing = |what: &str| GalfitError::InvalidArgumentError {
        reason: format!("object table has no {} column", what),
    };
    Ok(ColumnLabels {
        ra: ra.ok_or_else(|| missing("RA"))?,
        dec: dec.ok_or_else(|| missing("DEC"))?,
        id: id.ok_or_else(|| missing("ID"))?,
    })
}

/// Reads the objects of a CSV table. Rows that cannot be read (missing ID,
/// coordinates that are not numbers) are logged and skipped; only a table
/// without usable columns is an error.
pub fn read_objects(data: &[u8]) -> Result<Vec<ObjectTarget>> {
    let mut reader = csv::Reader::from_reader(data);
    let labels = column_labels(reader.headers()?)?;

    let mut objects = Vec::new();
    let mut skipped = 0;
    for (row, record) in reader.records().enumerate() {
        match record.map_err(GalfitError::from).and_then(|r| object_from_row(&r, &labels)) {
            Ok(object) => objects.push(object),
            Err(e) => {
                skipped += 1;
                tracing::warn!("⚠️ Skipping row {} of the object table: {}", row + 1, e);
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("⚠️ {} rows of the object table were skipped", skipped);
    }
    tracing::debug!("Read {} objects from table", objects.len());
    Ok(objects)
}

fn object_from_row(record: &csv::StringRecord, labels: &ColumnLabels) -> Result<ObjectTarget> {
    let field = |index: usize| record.get(index).unwrap_or_default().trim();
    let coordinate = |index: usize, what: &str| -> Result<f64> {
        field(index)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GalfitError::InvalidArgumentError {
                reason: format!("{} {:?} is not a number", what, field(index)),
            })
    };

    let name = field(labels.id);
    if name.is_empty() {
        return Err(GalfitError::InvalidArgumentError {
            reason: "empty ID".to_string(),
        });
    }
    Ok(ObjectTarget {
        name: name.to_string(),
        ra: coordinate(labels.ra, "RA")?,
        dec: coordinate(labels.dec, "DEC")?,
    })
}

/// Photometric zero points keyed by (field, band).
#[derive(Debug, Clone, Default)]
pub struct ZeroPointTable {
    entries: HashMap<(String, String), f64>,
}

impl ZeroPointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSV with `field`, `band` and `zp` columns (any order, case-insensitive).
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| GalfitError::InvalidArgumentError {
                    reason: format!("zero-point table has no {} column", name),
                })
        };
        let (field, band, zp) = (column("field")?, column("band")?, column("zp")?);

        let mut table = Self::new();
        for record in reader.records() {
            let record = record?;
            let get = |index: usize| record.get(index).unwrap_or_default().trim();
            let value = get(zp).parse().map_err(|_| GalfitError::InvalidArgumentError {
                reason: format!("zero point {:?} is not a number", get(zp)),
            })?;
            table.insert(get(field), get(band), value);
        }
        Ok(table)
    }

    pub fn insert(&mut self, field: &str, band: &str, zp: f64) {
        self.entries
            .insert((field.to_string(), band.to_lowercase()), zp);
    }

    pub fn get(&self, field: &str, band: &str) -> Result<f64> {
        self.entries
            .get(&(field.to_string(), band.to_lowercase()))
            .copied()
            .ok_or_else(|| GalfitError::MissingZeroPointError {
                field: field.to_string(),
                band: band.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_objects_detects_columns() {
        let csv = "ID,RA_deg,DEC_deg,z\nNGC1087,41.605,-0.498,0.005\nNGC1042,40.099,-8.433,0.004\n";
        let objects = read_objects(csv.as_bytes()).unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "NGC1087");
        assert_eq!(objects[1].dec, -8.433);
    }

    #[test]
    fn test_read_objects_rejects_missing_columns() {
        let csv = "name,x,y\nA,1,2\n";
        assert!(matches!(
            read_objects(csv.as_bytes()),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = "ID,RA,DEC\nNGC1,10.5,-3.2\nNGC2,,-1.0\nNGC3,11.0,north\n,12.0,1.0\nNGC5,12.5,2.0\n";
        let objects = read_objects(csv.as_bytes()).unwrap();

        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["NGC1", "NGC5"]);
        assert_eq!(objects[1].ra, 12.5);
    }

    #[test]
    fn test_zero_points() {
        let csv = "Field,Band,ZP\nSPLUS-s28s33,r,23.41\nSPLUS-s28s33,J0660,20.12\n";
        let table = ZeroPointTable::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("SPLUS-s28s33", "R").unwrap(), 23.41);
        assert_eq!(table.get("SPLUS-s28s33", "j0660").unwrap(), 20.12);
        assert!(matches!(
            table.get("SPLUS-s28s33", "g"),
            Err(GalfitError::MissingZeroPointError { .. })
        ));
    }
}
