//! Static registry of feedme base fields and component templates.
//!
//! Nothing here is ever mutated: a [`Model`](super::model::Model) copies the
//! defaults out of the registry and works on its own copies.

use crate::utils::error::{GalfitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Keys of the feedme header section, in declaration (and write) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaseKey {
    A,
    A1,
    A2,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    O,
    P,
    U,
}

impl BaseKey {
    pub const ALL: [BaseKey; 16] = [
        BaseKey::A,
        BaseKey::A1,
        BaseKey::A2,
        BaseKey::B,
        BaseKey::C,
        BaseKey::D,
        BaseKey::E,
        BaseKey::F,
        BaseKey::G,
        BaseKey::H,
        BaseKey::I,
        BaseKey::J,
        BaseKey::K,
        BaseKey::O,
        BaseKey::P,
        BaseKey::U,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseKey::A => "A",
            BaseKey::A1 => "A1",
            BaseKey::A2 => "A2",
            BaseKey::B => "B",
            BaseKey::C => "C",
            BaseKey::D => "D",
            BaseKey::E => "E",
            BaseKey::F => "F",
            BaseKey::G => "G",
            BaseKey::H => "H",
            BaseKey::I => "I",
            BaseKey::J => "J",
            BaseKey::K => "K",
            BaseKey::O => "O",
            BaseKey::P => "P",
            BaseKey::U => "U",
        }
    }

    /// Default value and comment, as written into a fresh feedme.
    fn defaults(&self) -> (&'static str, &'static str) {
        match self {
            BaseKey::A => ("", "Input data image (FITS file)"),
            BaseKey::A1 => ("g, r, i", "Nick names (band labels)"),
            BaseKey::A2 => ("4770, 6231, 7625", "Effective wavelenghts"),
            BaseKey::B => ("4770, 6231, 7625", "Output data image block"),
            BaseKey::C => ("", "Sigma image name (made from data if blank or 'none')"),
            BaseKey::D => ("", "Input PSF image and (optional) diffusion kernel"),
            BaseKey::E => ("1", "PSF fine sampling factor relative to data"),
            BaseKey::F => ("none", "Bad pixel mask (FITS image or ASCII coord list)"),
            BaseKey::G => ("none", "File with parameter constraints (ASCII file)"),
            BaseKey::H => ("1    200  1  200", "Image region to fit (xmin xmax ymin ymax)"),
            BaseKey::I => ("200  200", "Size of the convolution box (x y)"),
            BaseKey::J => ("0,0,0", "Magnitude photometric zeropoint"),
            BaseKey::K => ("0.55  0.55", "Plate scale (dx dy)   [arcsec per pixel]"),
            BaseKey::O => ("regular", "Display type (regular, curses, both)"),
            BaseKey::P => ("0", "Choose: 0=optimize, 1=model, 2=imgblock, 3=subcomps"),
            BaseKey::U => ("0", ""),
        }
    }
}

impl fmt::Display for BaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseKey {
    type Err = GalfitError;

    fn from_str(s: &str) -> Result<Self> {
        BaseKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| GalfitError::UnknownParameterError { key: s.to_string() })
    }
}

/// Parameter keys of a component block. Declaration order is write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamKey {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    P10,
    Z,
}

impl ParamKey {
    pub const ALL: [ParamKey; 11] = [
        ParamKey::P1,
        ParamKey::P2,
        ParamKey::P3,
        ParamKey::P4,
        ParamKey::P5,
        ParamKey::P6,
        ParamKey::P7,
        ParamKey::P8,
        ParamKey::P9,
        ParamKey::P10,
        ParamKey::Z,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::P1 => "1",
            ParamKey::P2 => "2",
            ParamKey::P3 => "3",
            ParamKey::P4 => "4",
            ParamKey::P5 => "5",
            ParamKey::P6 => "6",
            ParamKey::P7 => "7",
            ParamKey::P8 => "8",
            ParamKey::P9 => "9",
            ParamKey::P10 => "10",
            ParamKey::Z => "Z",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKey {
    type Err = GalfitError;

    fn from_str(s: &str) -> Result<Self> {
        ParamKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| GalfitError::UnknownParameterError { key: s.to_string() })
    }
}

/// Model profile types known to GalfitM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Sersic,
    Expdisk,
    Moffat,
    Ferrer,
    Psf,
    Sky,
    Nuker,
    Corser,
    Devauc,
    Edgedisk,
    Gaussian,
    King,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 12] = [
        ComponentKind::Sersic,
        ComponentKind::Expdisk,
        ComponentKind::Moffat,
        ComponentKind::Ferrer,
        ComponentKind::Psf,
        ComponentKind::Sky,
        ComponentKind::Nuker,
        ComponentKind::Corser,
        ComponentKind::Devauc,
        ComponentKind::Edgedisk,
        ComponentKind::Gaussian,
        ComponentKind::King,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Sersic => "sersic",
            ComponentKind::Expdisk => "expdisk",
            ComponentKind::Moffat => "moffat",
            ComponentKind::Ferrer => "ferrer",
            ComponentKind::Psf => "psf",
            ComponentKind::Sky => "sky",
            ComponentKind::Nuker => "nuker",
            ComponentKind::Corser => "corser",
            ComponentKind::Devauc => "devauc",
            ComponentKind::Edgedisk => "edgedisk",
            ComponentKind::Gaussian => "gaussian",
            ComponentKind::King => "king",
        }
    }

    fn slot_defs(&self) -> &'static [SlotDef] {
        match self {
            ComponentKind::Sersic => SERSIC,
            ComponentKind::Expdisk => EXPDISK,
            ComponentKind::Moffat => MOFFAT,
            ComponentKind::Ferrer => FERRER,
            ComponentKind::Psf => PSF,
            ComponentKind::Sky => SKY,
            ComponentKind::Nuker => NUKER,
            ComponentKind::Corser => CORSER,
            ComponentKind::Devauc => DEVAUC,
            ComponentKind::Edgedisk => EDGEDISK,
            ComponentKind::Gaussian => GAUSSIAN,
            ComponentKind::King => KING,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = GalfitError;

    fn from_str(s: &str) -> Result<Self> {
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GalfitError::UnknownComponentError { name: s.to_string() })
    }
}

/// One header entry: a free-form value and its fixed comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseField {
    pub value: String,
    pub comment: String,
}

/// One parameter line of a component block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSlot {
    /// Value, either a comma-joined per-band list or one shared scalar.
    pub col1: String,
    /// Degrees of freedom, blank for parameters that are not fitted.
    pub col2: String,
    /// Free-text flag, canonically `band`.
    pub col3: String,
    pub comment: String,
}

impl ParameterSlot {
    pub fn new(col1: &str, col2: &str, col3: &str, comment: &str) -> Self {
        Self {
            col1: col1.to_string(),
            col2: col2.to_string(),
            col3: col3.to_string(),
            comment: comment.to_string(),
        }
    }

    /// Per-band values of `col1`, whitespace-trimmed.
    pub fn values(&self) -> Vec<&str> {
        self.col1.split(',').map(str::trim).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTemplate {
    pub kind: ComponentKind,
    pub params: BTreeMap<ParamKey, ParameterSlot>,
}

type SlotDef = (ParamKey, &'static str, &'static str, &'static str, &'static str);

const POS_X: SlotDef = (ParamKey::P1, "200.0,200.0,200.0", "1", "band", "Position x [pixel]");
const POS_Y: SlotDef = (ParamKey::P2, "200.0,200.0,200.0", "1", "band", "Position y [pixel]");
const AXIS_RATIO: SlotDef = (ParamKey::P9, "0,0,0", "1", "band", "Axis ratio (b/a)");
const POSITION_ANGLE: SlotDef = (
    ParamKey::P10,
    "0,0,0",
    "1",
    "band",
    "Position angle (PA) [deg: Up=0, Left=90]",
);
const SKIP: SlotDef = (ParamKey::Z, "0", "", "", "Skip this model in output image? (yes=1, no=0)");

const SERSIC: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Integrated magnitude"),
    (ParamKey::P4, "0,0,0", "2", "band", "R_e (effective radius) [pix]"),
    (ParamKey::P5, "4", "2", "band", "Sersic index n (de Vaucouleurs n=4)"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const EXPDISK: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Integrated magnitude"),
    (ParamKey::P4, "0,0,0", "2", "band", "R_s (disk scale lengths) [pix]"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const MOFFAT: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Total magnitude"),
    (ParamKey::P4, "0,0,0", "2", "band", "FWHM [pix]"),
    (ParamKey::P5, "0,0,0", "2", "band", "powerlaw"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const FERRER: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Central surface brghtness [mag/arcsec^2]"),
    (ParamKey::P4, "0,0,0", "2", "band", "Outer truncation radius [pix]"),
    (ParamKey::P5, "0,0,0", "2", "band", "Alpha (outer truncation sharpness)"),
    (ParamKey::P6, "0,0,0", "2", "band", "Beta (central slope)"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const PSF: &[SlotDef] = &[
    (ParamKey::P1, "0,0,0", "0", "band", "Position x [pixel]"),
    (ParamKey::P2, "0,0,0", "0", "band", "Position y [pixel]"),
    (ParamKey::P3, "0,0,0", "0", "band", "Total magnitude"),
    SKIP,
];

const SKY: &[SlotDef] = &[
    (ParamKey::P1, "0,0,0", "0", "band", "Sky background at center of fitting region [ADUs]"),
    (ParamKey::P2, "0,0,0", "0", "band", "dsky/dx (sky gradient in x) [ADUs/pix]"),
    (ParamKey::P3, "0,0,0", "0", "band", "dsky/dy (sky gradient in y) [ADUs/pix]"),
    SKIP,
];

const NUKER: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "mu(Rb) surface brightness at Rb [mag/arcsec^2]"),
    (ParamKey::P4, "0,0,0", "2", "band", "Rb (break radius) [pix]"),
    (ParamKey::P5, "1,1,1", "2", "band", "alpha (sharpness of transition)"),
    (ParamKey::P6, "1,1,1", "2", "band", "beta (outer powerlaw slope)"),
    (ParamKey::P7, "0,0,0", "2", "band", "gamma (inner powerlaw slope)"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const CORSER: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "mu(Rb) surface brightness at Rb [mag/arcsec^2]"),
    (ParamKey::P4, "0,0,0", "2", "band", "Rb (break radius) [pix]"),
    (ParamKey::P5, "0,0,0", "2", "band", "R_e (effective radius) [pix]"),
    (ParamKey::P6, "4", "2", "band", "Sersic index n"),
    (ParamKey::P7, "1,1,1", "2", "band", "alpha (sharpness of transition)"),
    (ParamKey::P8, "0,0,0", "2", "band", "gamma (inner powerlaw slope)"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const DEVAUC: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Integrated magnitude"),
    (ParamKey::P4, "0,0,0", "2", "band", "R_e (effective radius) [pix]"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const EDGEDISK: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "mu(0) central surface brightness [mag/arcsec^2]"),
    (ParamKey::P4, "0,0,0", "2", "band", "h_s (disk scale-height) [pix]"),
    (ParamKey::P5, "0,0,0", "2", "band", "R_s (disk scale-length) [pix]"),
    POSITION_ANGLE,
    SKIP,
];

const GAUSSIAN: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "Integrated magnitude"),
    (ParamKey::P4, "0,0,0", "2", "band", "FWHM [pix]"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

const KING: &[SlotDef] = &[
    POS_X,
    POS_Y,
    (ParamKey::P3, "0,0,0", "3", "band", "mu(0) central surface brightness [mag/arcsec^2]"),
    (ParamKey::P4, "0,0,0", "2", "band", "R_c (core radius) [pix]"),
    (ParamKey::P5, "0,0,0", "2", "band", "R_t (truncation radius) [pix]"),
    (ParamKey::P6, "2", "2", "band", "alpha (powerlaw)"),
    AXIS_RATIO,
    POSITION_ANGLE,
    SKIP,
];

/// All registered component types.
pub fn component_types() -> BTreeSet<ComponentKind> {
    ComponentKind::ALL.iter().copied().collect()
}

/// A fresh copy of the template for `kind`.
pub fn template(kind: ComponentKind) -> ComponentTemplate {
    let params = kind
        .slot_defs()
        .iter()
        .map(|(key, col1, col2, col3, comment)| {
            (*key, ParameterSlot::new(col1, col2, col3, comment))
        })
        .collect();

    ComponentTemplate { kind, params }
}

/// Base fields with their default values, in declaration order.
pub fn base_field_defaults() -> Vec<(BaseKey, BaseField)> {
    BaseKey::ALL
        .iter()
        .map(|key| {
            let (value, comment) = key.defaults();
            (
                *key,
                BaseField {
                    value: value.to_string(),
                    comment: comment.to_string(),
                },
            )
        })
        .collect()
}
