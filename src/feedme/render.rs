use super::model::{ComponentInstance, Model};
use super::schema::{BaseField, BaseKey, ParamKey, ParameterSlot};
use crate::utils::error::Result;
use std::fmt::Write as _;
use std::path::Path;

const BASE_VALUE_WIDTH: usize = 32;
const COL1_WIDTH: usize = 35;
const COL2_WIDTH: usize = 5;
const COL3_WIDTH: usize = 10;

/// Renders the whole feedme: base section, then every active component.
pub fn render(model: &Model) -> String {
    let mut out = render_base(model);
    for component in model.active_instances() {
        out.push_str("\n\n\n");
        out.push_str(&render_component(component));
    }
    out
}

/// The base section alone, one line per field.
pub fn render_base(model: &Model) -> String {
    let mut out = String::new();
    for (key, field) in model.base_fields() {
        out.push_str(&base_line(*key, field));
    }
    out
}

/// One component block: the `0)` header and its parameter lines.
///
/// The header carries the canonical type name, never the instance suffix.
pub fn render_component(component: &ComponentInstance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "0) {}", component.kind.as_str());
    for (key, slot) in &component.params {
        out.push_str(&param_line(*key, slot));
    }
    out
}

/// Writes the rendered model to `path`, replacing any existing file.
pub fn write_feedme(model: &Model, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render(model))?;
    tracing::debug!(
        "Feedme written to {} ({} components)",
        path.display(),
        model.active_components().len()
    );
    Ok(())
}

fn base_line(key: BaseKey, field: &BaseField) -> String {
    format!(
        "{}) {:<width$} # {}\n",
        key,
        field.value,
        field.comment,
        width = BASE_VALUE_WIDTH
    )
}

fn param_line(key: ParamKey, slot: &ParameterSlot) -> String {
    // col2 and col3 are not separated by padding alone; keep them two tokens
    // when col2 fills its column.
    let col2 = if slot.col2.len() >= COL2_WIDTH && !slot.col3.is_empty() {
        format!("{} ", slot.col2)
    } else {
        slot.col2.clone()
    };

    format!(
        "{}) {:<w1$} {:<w2$}{:<w3$} # {}\n",
        key,
        slot.col1,
        col2,
        slot.col3,
        slot.comment,
        w1 = COL1_WIDTH,
        w2 = COL2_WIDTH,
        w3 = COL3_WIDTH
    )
}
