//! Physical thread model: yarn counts are normalized to Tex, turned into a
//! diameter and finally into the ink weight one line removes per pixel.

use serde::{Deserialize, Serialize};

/// Visual density multiplier applied to the yarn diameter by default.
pub const DEFAULT_DENSITY_FACTOR: f64 = 1.10;

/// A yarn count in one of the usual textile systems.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum YarnSpec {
    /// Sewing thread ticket number.
    Ticket { ticket_no: f64 },
    /// Metric count, meters per gram.
    Nm { nm: f64, ply: Option<u32> },
    /// Grams per 1000 meters.
    Tex { tex: f64 },
    /// Grams per 10000 meters.
    Dtex { dtex: f64, ply: Option<u32> },
    /// Grams per 9000 meters.
    Denier { denier: f64, ply: Option<u32> },
    /// A weighed sample of the yarn.
    LengthWeight { grams: f64, meters: f64 },
    /// Measured diameter, skips the Tex based estimation.
    Diameter { mm: f64 },
}

impl YarnSpec {
    /// Linear density in Tex.
    pub fn tex(&self) -> Result<f64, Error> {
        let ply = |ply: Option<u32>| ply.unwrap_or(1) as f64;
        match *self {
            Self::Ticket { ticket_no } => Ok(3000.0 / positive("ticket number", ticket_no)?),
            Self::Nm { nm, ply: p } => Ok(1000.0 * ply(p) / positive("Nm", nm)?),
            Self::Tex { tex } => positive("Tex", tex),
            Self::Dtex { dtex, ply: p } => Ok(positive("dtex", dtex)? * ply(p) / 10.0),
            Self::Denier { denier, ply: p } => Ok(positive("denier", denier)? * ply(p) / 9.0),
            Self::LengthWeight { grams, meters } => {
                Ok(positive("grams", grams)? / positive("meters", meters)? * 1000.0)
            }
            Self::Diameter { .. } => Err(Error::NoLinearDensity),
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, Error> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidValue { name, value })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Cotton,
    Nylon,
    Polyester,
    #[default]
    Unknown,
}

impl Material {
    /// Fiber density in kg/m³.
    pub fn density(self) -> f64 {
        match self {
            Self::Cotton => 1540.0,
            Self::Nylon => 1140.0,
            Self::Polyester | Self::Unknown => 1380.0,
        }
    }
}

/// Diameter in millimeters of a solid round fiber bundle of `tex` linear density.
pub fn tex_to_diameter_mm(tex: f64, material: Material) -> f64 {
    let mass_per_length = tex * 1e-6;
    let area = mass_per_length / material.density();
    2.0 * (area / std::f64::consts::PI).sqrt() * 1000.0
}

/// Ink weight for a thread `thickness_mm` wide drawn on pixels of
/// `max_dimension_mm / resolution` millimeters.
pub fn thickness_to_weight(thickness_mm: f64, max_dimension_mm: f64, resolution: u32) -> u8 {
    let pixel_size = max_dimension_mm / resolution as f64;
    (thickness_mm / pixel_size * 255.0).round().clamp(1.0, 255.0) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Yarn {
    pub spec: YarnSpec,
    #[serde(default)]
    pub material: Material,
    /// Takes precedence over anything derived from [`Self::spec`].
    #[serde(default)]
    pub diameter_override: Option<f64>,
    #[serde(default = "default_density_factor")]
    pub density_factor: f64,
}

fn default_density_factor() -> f64 {
    DEFAULT_DENSITY_FACTOR
}

impl Yarn {
    pub fn new(spec: YarnSpec) -> Self {
        Self {
            spec,
            material: Material::default(),
            diameter_override: None,
            density_factor: DEFAULT_DENSITY_FACTOR,
        }
    }

    pub fn diameter_mm(&self) -> Result<f64, Error> {
        match (self.diameter_override, self.spec) {
            (Some(mm), _) | (None, YarnSpec::Diameter { mm }) => positive("diameter", mm),
            (None, spec) => Ok(tex_to_diameter_mm(spec.tex()?, self.material)),
        }
    }

    /// Diameter scaled by the visual density factor.
    pub fn thickness_mm(&self) -> Result<f64, Error> {
        Ok(self.diameter_mm()? * positive("density factor", self.density_factor)?)
    }

    pub fn line_weight(&self, max_dimension_mm: f64, resolution: u32) -> Result<u8, Error> {
        Ok(thickness_to_weight(
            self.thickness_mm()?,
            max_dimension_mm,
            resolution,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Yarn {name} must be a positive number, got {value}")]
    InvalidValue { name: &'static str, value: f64 },
    #[error("A diameter yarn specification has no linear density")]
    NoLinearDensity,
}
