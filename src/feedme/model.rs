use super::schema::{self, BaseField, BaseKey, ComponentKind, ParamKey, ParameterSlot};
use super::validate;
use crate::utils::error::{GalfitError, Result};
use std::collections::{BTreeMap, HashMap};

/// One activated copy of a component template.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    /// Bare type name for the first instance, `type + n` for later ones.
    pub name: String,
    pub kind: ComponentKind,
    pub params: BTreeMap<ParamKey, ParameterSlot>,
}

impl ComponentInstance {
    fn from_template(kind: ComponentKind, name: String) -> Self {
        Self {
            name,
            kind,
            params: schema::template(kind).params,
        }
    }

    pub fn param(&self, key: ParamKey) -> Option<&ParameterSlot> {
        self.params.get(&key)
    }
}

/// Column of a parameter line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Value,
    Dof,
    Flag,
}

impl TryFrom<u8> for Column {
    type Error = GalfitError;

    fn try_from(column: u8) -> Result<Self> {
        match column {
            1 => Ok(Column::Value),
            2 => Ok(Column::Dof),
            3 => Ok(Column::Flag),
            other => Err(GalfitError::InvalidArgumentError {
                reason: format!("column must be 1, 2 or 3, got {}", other),
            }),
        }
    }
}

impl Column {
    fn slot_mut<'a>(&self, slot: &'a mut ParameterSlot) -> &'a mut String {
        match self {
            Column::Value => &mut slot.col1,
            Column::Dof => &mut slot.col2,
            Column::Flag => &mut slot.col3,
        }
    }
}

/// In-memory feedme document.
///
/// A fresh model holds every base field with its default and one inactive
/// configuration per registered component type. Only active components are
/// written, in activation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    base: BTreeMap<BaseKey, BaseField>,
    components: Vec<ComponentInstance>,
    active: Vec<String>,
    occurrences: HashMap<ComponentKind, usize>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        let base = schema::base_field_defaults().into_iter().collect();
        let components = ComponentKind::ALL
            .iter()
            .map(|kind| ComponentInstance::from_template(*kind, kind.as_str().to_string()))
            .collect();

        Self {
            name: String::new(),
            base,
            components,
            active: Vec::new(),
            occurrences: HashMap::new(),
        }
    }

    /// A model with no base fields and no components, filled in by the parser.
    pub(crate) fn empty() -> Self {
        Self {
            name: String::new(),
            base: BTreeMap::new(),
            components: Vec::new(),
            active: Vec::new(),
            occurrences: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // ---- base fields ----

    pub fn base_fields(&self) -> impl Iterator<Item = (&BaseKey, &BaseField)> {
        self.base.iter()
    }

    pub fn base_field(&self, key: BaseKey) -> Option<&BaseField> {
        self.base.get(&key)
    }

    pub fn base_value(&self, key: BaseKey) -> Option<&str> {
        self.base.get(&key).map(|field| field.value.as_str())
    }

    /// Surrounding whitespace is dropped, as it would be when parsed back.
    pub fn set_base_value(&mut self, key: BaseKey, value: impl ToString) -> Result<()> {
        let value = value.to_string().trim().to_string();
        check_base_value(key, &value)?;

        match self.base.get_mut(&key) {
            Some(field) => field.value = value,
            None => {
                // A parsed model only carries the fields the tool echoed.
                let comment = schema::base_field_defaults()
                    .into_iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, field)| field.comment)
                    .unwrap_or_default();
                self.base.insert(key, BaseField { value, comment });
            }
        }
        Ok(())
    }

    /// Same as [`set_base_value`](Self::set_base_value) with the key given by name.
    pub fn set_base_value_by_name(&mut self, key: &str, value: impl ToString) -> Result<()> {
        let key: BaseKey = key.parse()?;
        self.set_base_value(key, value)
    }

    pub fn set_base_values<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (BaseKey, V)>,
        V: ToString,
    {
        let values: Vec<(BaseKey, String)> = values
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        for (key, value) in &values {
            check_base_value(*key, value)?;
        }
        for (key, value) in values {
            self.set_base_value(key, value)?;
        }
        Ok(())
    }

    pub(crate) fn insert_base_field(&mut self, key: BaseKey, field: BaseField) {
        self.base.insert(key, field);
    }

    /// Band labels declared in `A1`.
    pub fn band_labels(&self) -> Vec<String> {
        self.base_value(BaseKey::A1)
            .map(|value| {
                value
                    .split(',')
                    .map(|band| band.trim().to_string())
                    .filter(|band| !band.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn band_count(&self) -> usize {
        self.band_labels().len()
    }

    // ---- components ----

    /// Activates one instance per requested type, in order.
    ///
    /// All names are checked before anything changes, so an unknown type
    /// leaves the active list untouched. Returns the activated instance names.
    pub fn activate_components<I, S>(&mut self, types: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = types
            .into_iter()
            .map(|name| name.as_ref().parse::<ComponentKind>())
            .collect::<Result<Vec<_>>>()?;

        if kinds.is_empty() {
            return Err(GalfitError::InvalidArgumentError {
                reason: "no component types given; use reset_components() to clear".to_string(),
            });
        }

        Ok(kinds.into_iter().map(|kind| self.activate(kind)).collect())
    }

    /// Activates one instance of `kind` and returns its name.
    pub fn activate(&mut self, kind: ComponentKind) -> String {
        let name = self.next_instance_name(kind);
        if self.component(&name).is_none() {
            self.components
                .push(ComponentInstance::from_template(kind, name.clone()));
        }
        self.active.push(name.clone());
        name
    }

    /// Clears the active list. Component configuration is kept.
    pub fn reset_components(&mut self) {
        self.active.clear();
        self.occurrences.clear();
    }

    pub fn active_components(&self) -> &[String] {
        &self.active
    }

    pub fn active_instances(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.active
            .iter()
            .filter_map(move |name| self.component(name))
    }

    pub fn component(&self, name: &str) -> Option<&ComponentInstance> {
        self.components.iter().find(|c| c.name == name)
    }

    fn component_mut(&mut self, name: &str) -> Result<&mut ComponentInstance> {
        self.components
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| GalfitError::UnknownComponentError {
                name: name.to_string(),
            })
    }

    fn next_instance_name(&mut self, kind: ComponentKind) -> String {
        let count = self.occurrences.entry(kind).or_insert(0);
        let name = if *count == 0 {
            kind.as_str().to_string()
        } else {
            format!("{}{}", kind.as_str(), count)
        };
        *count += 1;
        name
    }

    pub fn set_component_value(
        &mut self,
        instance: &str,
        key: ParamKey,
        value: impl ToString,
        column: u8,
    ) -> Result<()> {
        self.set_component_values(instance, [(key, value)], column)
    }

    /// Sets one column of several parameters.
    pub fn set_component_values<I, V>(&mut self, instance: &str, values: I, column: u8) -> Result<()>
    where
        I: IntoIterator<Item = (ParamKey, V)>,
        V: ToString,
    {
        let column = Column::try_from(column)?;
        let values: Vec<(ParamKey, String)> = values
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();

        let component = self.component_mut(instance)?;
        for (key, value) in &values {
            check_column_value(column, value)?;
            let Some(slot) = component.params.get(key) else {
                return Err(unknown_param(component, *key));
            };
            match column {
                Column::Value => {}
                Column::Dof => check_flag_follows_dof(*key, value, &slot.col3)?,
                Column::Flag => check_flag_follows_dof(*key, &slot.col2, value)?,
            }
        }
        for (key, value) in values {
            if let Some(slot) = component.params.get_mut(&key) {
                *column.slot_mut(slot) = value;
            }
        }
        Ok(())
    }

    /// Sets up to three columns per parameter, positionally (col1, col2, col3).
    pub fn set_component_columns<I, C, V>(&mut self, instance: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (ParamKey, C)>,
        C: IntoIterator<Item = V>,
        V: ToString,
    {
        let values: Vec<(ParamKey, Vec<String>)> = values
            .into_iter()
            .map(|(key, cols)| (key, cols.into_iter().map(|v| v.to_string()).collect()))
            .collect();

        let component = self.component_mut(instance)?;
        for (key, cols) in &values {
            if cols.len() > 3 {
                return Err(GalfitError::InvalidArgumentError {
                    reason: format!(
                        "parameter {} takes at most 3 columns, got {}",
                        key,
                        cols.len()
                    ),
                });
            }
            let Some(slot) = component.params.get(key) else {
                return Err(unknown_param(component, *key));
            };
            for (index, value) in cols.iter().enumerate() {
                check_column_value(COLUMNS[index], value)?;
            }
            let col2 = cols.get(1).unwrap_or(&slot.col2);
            let col3 = cols.get(2).unwrap_or(&slot.col3);
            check_flag_follows_dof(*key, col2, col3)?;
        }
        for (key, cols) in values {
            if let Some(slot) = component.params.get_mut(&key) {
                for (index, value) in cols.into_iter().enumerate() {
                    *COLUMNS[index].slot_mut(slot) = value;
                }
            }
        }
        Ok(())
    }

    /// Starts a new parsed component block and returns its instance name.
    pub(crate) fn push_parsed_component(&mut self, kind: ComponentKind) -> String {
        let name = self.next_instance_name(kind);
        self.components.push(ComponentInstance {
            name: name.clone(),
            kind,
            params: BTreeMap::new(),
        });
        self.active.push(name.clone());
        name
    }

    pub(crate) fn insert_parsed_slot(&mut self, instance: &str, key: ParamKey, slot: ParameterSlot) {
        if let Some(component) = self.components.iter_mut().find(|c| c.name == instance) {
            component.params.insert(key, slot);
        }
    }

    /// Advisory band/degrees-of-freedom check; see [`validate::band_warnings`].
    pub fn validate_band_consistency(&self) -> bool {
        validate::validate_band_consistency(self)
    }
}

const COLUMNS: [Column; 3] = [Column::Value, Column::Dof, Column::Flag];

fn unknown_param(component: &ComponentInstance, key: ParamKey) -> GalfitError {
    GalfitError::UnknownParameterError {
        key: format!("{}.{}", component.name, key),
    }
}

fn check_base_value(key: BaseKey, value: &str) -> Result<()> {
    if value.contains('#') || value.contains('\n') || value.contains('\r') {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!("value for {} may not contain '#' or line breaks: {:?}", key, value),
        });
    }
    Ok(())
}

// Component lines are split on whitespace, so a column is a single token.
fn check_column_value(column: Column, value: &str) -> Result<()> {
    if value.contains('#') || value.chars().any(char::is_whitespace) {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!("column values may not contain whitespace or '#': {:?}", value),
        });
    }
    if column == Column::Value && value.is_empty() {
        return Err(GalfitError::InvalidArgumentError {
            reason: "column 1 may not be blank".to_string(),
        });
    }
    Ok(())
}

// Columns are positional on the line: a flag after a blank col2 would be
// read back as col2.
fn check_flag_follows_dof(key: ParamKey, col2: &str, col3: &str) -> Result<()> {
    if col2.is_empty() && !col3.is_empty() {
        return Err(GalfitError::InvalidArgumentError {
            reason: format!("parameter {} has col3 {:?} but a blank col2", key, col3),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_activation_is_disambiguated() {
        let mut model = Model::new();
        let names = model.activate_components(["sersic", "sersic"]).unwrap();

        assert_eq!(names, vec!["sersic", "sersic1"]);
        assert_eq!(model.active_components(), &["sersic", "sersic1"]);

        model
            .set_component_value("sersic1", ParamKey::P3, "15,16,17", 1)
            .unwrap();

        let first = model.component("sersic").unwrap();
        let second = model.component("sersic1").unwrap();
        assert_eq!(first.params[&ParamKey::P3].col1, "0,0,0");
        assert_eq!(second.params[&ParamKey::P3].col1, "15,16,17");
    }

    #[test]
    fn test_suffix_counts_exact_type_only() {
        let mut model = Model::new();
        model
            .activate_components(["sky", "sersic", "sky", "expdisk", "sersic"])
            .unwrap();

        assert_eq!(
            model.active_components(),
            &["sky", "sersic", "sky1", "expdisk", "sersic1"]
        );
    }

    #[test]
    fn test_unknown_component_leaves_active_list_unchanged() {
        let mut model = Model::new();
        model.activate_components(["sersic"]).unwrap();

        let err = model
            .activate_components(["sky", "nonexistent_type"])
            .unwrap_err();

        assert!(matches!(err, GalfitError::UnknownComponentError { .. }));
        assert_eq!(model.active_components(), &["sersic"]);
    }

    #[test]
    fn test_empty_activation_is_rejected() {
        let mut model = Model::new();
        let none: [&str; 0] = [];
        assert!(matches!(
            model.activate_components(none),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let mut model = Model::new();
        model.activate_components(["sersic"]).unwrap();
        model
            .set_component_value("sersic", ParamKey::P5, "2.5", 1)
            .unwrap();

        model.reset_components();
        assert!(model.active_components().is_empty());

        model.activate_components(["sersic"]).unwrap();
        let sersic = model.component("sersic").unwrap();
        assert_eq!(sersic.params[&ParamKey::P5].col1, "2.5");
    }

    #[test]
    fn test_inactive_templates_are_configurable() {
        let mut model = Model::new();
        model
            .set_component_value("sky", ParamKey::P1, "1,2,3", 1)
            .unwrap();

        assert!(model.active_components().is_empty());
        assert_eq!(model.component("sky").unwrap().params[&ParamKey::P1].col1, "1,2,3");
    }

    #[test]
    fn test_set_base_value_by_name() {
        let mut model = Model::new();
        model.set_base_value_by_name("A1", "u,g,r,i").unwrap();
        assert_eq!(model.band_count(), 4);

        assert!(matches!(
            model.set_base_value_by_name("Q", "x"),
            Err(GalfitError::UnknownParameterError { .. })
        ));
        assert!(matches!(
            model.set_base_value(BaseKey::A, "image.fits # oops"),
            Err(GalfitError::InvalidArgumentError { .. })
        ));

        model.set_base_value(BaseKey::A, "  img.fits \t").unwrap();
        assert_eq!(model.base_value(BaseKey::A), Some("img.fits"));
    }

    #[test]
    fn test_set_component_value_errors() {
        let mut model = Model::new();

        assert!(matches!(
            model.set_component_value("sersic2", ParamKey::P1, "1", 1),
            Err(GalfitError::UnknownComponentError { .. })
        ));
        assert!(matches!(
            model.set_component_value("sersic", ParamKey::P1, "1", 4),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
        assert!(matches!(
            model.set_component_value("sersic", ParamKey::P7, "1", 1),
            Err(GalfitError::UnknownParameterError { .. })
        ));
        assert!(matches!(
            model.set_component_value("sersic", ParamKey::P1, "1, 2", 1),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
    }

    #[test]
    fn test_set_component_columns() {
        let mut model = Model::new();
        model
            .set_component_columns(
                "sersic",
                [
                    (ParamKey::P3, vec!["14.1,14.0,13.9", "3", "band"]),
                    (ParamKey::P5, vec!["1.5"]),
                ],
            )
            .unwrap();

        let sersic = model.component("sersic").unwrap();
        assert_eq!(
            sersic.params[&ParamKey::P3],
            ParameterSlot::new("14.1,14.0,13.9", "3", "band", "Integrated magnitude")
        );
        assert_eq!(sersic.params[&ParamKey::P5].col1, "1.5");
        assert_eq!(sersic.params[&ParamKey::P5].col2, "2");

        let err = model
            .set_component_columns("sersic", [(ParamKey::P4, vec!["1", "2", "band", "extra"])])
            .unwrap_err();
        assert!(matches!(err, GalfitError::InvalidArgumentError { .. }));
        // rejected tuples leave the slot untouched
        assert_eq!(model.component("sersic").unwrap().params[&ParamKey::P4].col1, "0,0,0");
    }

    #[test]
    fn test_flag_requires_dof() {
        let mut model = Model::new();

        assert!(matches!(
            model.set_component_value("sersic", ParamKey::P5, "", 2),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
        assert!(matches!(
            model.set_component_columns("sersic", [(ParamKey::P5, vec!["4", "", "band"])]),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
        assert!(matches!(
            model.set_component_value("sky", ParamKey::Z, "band", 3),
            Err(GalfitError::InvalidArgumentError { .. })
        ));
        assert_eq!(model.component("sersic").unwrap().params[&ParamKey::P5].col2, "2");

        // clearing both columns together is fine
        model
            .set_component_columns("sersic", [(ParamKey::P5, vec!["4", "", ""])])
            .unwrap();
        let slot = &model.component("sersic").unwrap().params[&ParamKey::P5];
        assert_eq!((slot.col2.as_str(), slot.col3.as_str()), ("", ""));
    }
}
