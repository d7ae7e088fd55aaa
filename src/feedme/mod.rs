//! The feedme engine: schema registry, model state, serializer,
//! deserializer and band-consistency validator.

pub mod model;
pub mod parse;
pub mod render;
pub mod schema;
pub mod validate;

pub use model::{Column, ComponentInstance, Model};
pub use parse::{parse, read_feedme};
pub use render::{render, render_base, render_component, write_feedme};
pub use schema::{BaseField, BaseKey, ComponentKind, ComponentTemplate, ParamKey, ParameterSlot};
pub use validate::{band_warnings, validate_band_consistency, BandWarning};
