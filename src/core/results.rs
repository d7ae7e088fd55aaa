//! Flat result records extracted from a model, and the CSV tables that
//! accumulate them across a batch run.

use crate::domain::model::ResultRecord;
use crate::domain::ports::Storage;
use crate::feedme::{BaseKey, Model};
use crate::utils::error::{GalfitError, Result};

/// Column stem for a parameter: comment up to the first `[`, with runs of
/// non-alphanumeric characters collapsed to `_`.
pub fn describe(comment: &str) -> String {
    let text = comment.split('[').next().unwrap_or_default();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Per-band values of a comma list; a single value applies to every band.
fn per_band<'a>(value: &'a str, bands: usize) -> Vec<&'a str> {
    let values: Vec<&str> = value.split(',').map(str::trim).collect();
    if values.len() == 1 {
        vec![values[0]; bands]
    } else {
        values
    }
}

/// `ID`, one column per band of every band parameter of the active
/// components, then `ZP_<band>`.
pub fn result_record(model: &Model) -> ResultRecord {
    let bands = model.band_labels();
    let mut record = ResultRecord::new();
    record.insert("ID", model.name());

    for component in model.active_instances() {
        for slot in component.params.values() {
            if slot.col3 != "band" {
                continue;
            }
            let stem = describe(&slot.comment);
            let values = per_band(&slot.col1, bands.len());
            for (i, band) in bands.iter().enumerate() {
                record.insert(
                    format!("{}_{}_{}", component.name, stem, band),
                    values.get(i).copied().unwrap_or_default(),
                );
            }
        }
    }

    let zero_points = per_band(model.base_value(BaseKey::J).unwrap_or_default(), bands.len());
    for (i, band) in bands.iter().enumerate() {
        record.insert(
            format!("ZP_{}", band),
            zero_points.get(i).copied().unwrap_or_default(),
        );
    }
    record
}

/// A CSV table of result records. Columns are the union of all records in
/// first-seen order; missing cells are empty.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    path: String,
    columns: Vec<String>,
    rows: Vec<ResultRecord>,
}

impl ResultStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Loads `path` from storage, or starts empty when it does not exist.
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        match storage.read_file(path).await {
            Ok(data) => {
                let mut store = Self::from_csv(&data)?;
                store.path = path.to_string();
                Ok(store)
            }
            Err(GalfitError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::new(path))
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = ResultRecord::new();
            for (column, value) in columns.iter().zip(record.iter()) {
                if !value.is_empty() {
                    row.insert(column.as_str(), value);
                }
            }
            rows.push(row);
        }

        Ok(Self {
            path: String::new(),
            columns,
            rows,
        })
    }

    pub fn push(&mut self, record: ResultRecord) {
        for column in record.column_names() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(self.columns.iter().map(|c| row.get(c).unwrap_or_default()))?;
        }
        writer.into_inner().map_err(|e| GalfitError::IoError(e.into_error()))
    }

    pub async fn save<S: Storage>(&self, storage: &S) -> Result<()> {
        storage.write_file(&self.path, &self.to_csv()?).await?;
        tracing::debug!("💾 {} rows written to {}", self.rows.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedme::ParamKey;

    fn model() -> Model {
        let mut model = Model::new().with_name("NGC1087");
        model.set_base_value(BaseKey::A1, "g,r").unwrap();
        model.set_base_value(BaseKey::J, "23.1,23.4").unwrap();
        model.activate_components(["sersic"]).unwrap();
        model
            .set_component_value("sersic", ParamKey::P3, "14.2,13.9", 1)
            .unwrap();
        model
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe("R_e (effective radius) [pix]"), "R_e_effective_radius");
        assert_eq!(describe("Integrated magnitude"), "Integrated_magnitude");
        assert_eq!(describe("Axis ratio (b/a)"), "Axis_ratio_b_a");
    }

    #[test]
    fn test_result_record_columns() {
        let record = result_record(&model());

        assert_eq!(record.get("ID"), Some("NGC1087"));
        assert_eq!(record.get("sersic_Integrated_magnitude_g"), Some("14.2"));
        assert_eq!(record.get("sersic_Integrated_magnitude_r"), Some("13.9"));
        // single shared value broadcast to every band
        assert_eq!(record.get("sersic_Sersic_index_n_de_Vaucouleurs_n_4_r"), Some("4"));
        assert_eq!(record.get("ZP_r"), Some("23.4"));
        assert!(record.get("sersic_Skip_this_model_in_output_image_yes_1_no_0_g").is_none());
    }

    #[test]
    fn test_store_unions_columns() {
        let mut store = ResultStore::new("before_fit.csv");
        let mut first = ResultRecord::new();
        first.insert("ID", "a");
        first.insert("x", "1");
        let mut second = ResultRecord::new();
        second.insert("ID", "b");
        second.insert("y", "2");
        store.push(first);
        store.push(second);

        let csv = String::from_utf8(store.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "ID,x,y\na,1,\nb,,2\n");

        let reloaded = ResultStore::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(reloaded.columns(), ["ID", "x", "y"]);
        assert_eq!(reloaded.rows()[1].get("y"), Some("2"));
        assert_eq!(reloaded.rows()[1].get("x"), None);
    }
}
