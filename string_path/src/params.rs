use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{yarn, Grid};

pub const NAIL_COUNT_RANGE: RangeInclusive<usize> = 3..=1000;
pub const LINE_COUNT_RANGE: RangeInclusive<usize> = 1..=10000;
pub const LINE_WEIGHT_RANGE: RangeInclusive<u32> = 1..=255;
pub const RESOLUTION_RANGE: RangeInclusive<u32> = 100..=2000;
pub const MIN_NAIL_DISTANCE_RANGE: RangeInclusive<usize> = 1..=50;

/// Physical outline of the table, in millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TableShape {
    Circle { hoop_diameter: f64 },
    Rectangle { width: f64, height: f64 },
}

impl Default for TableShape {
    fn default() -> Self {
        Self::Circle {
            hoop_diameter: 500.0,
        }
    }
}

impl TableShape {
    /// `(width, height)` in millimeters.
    pub fn dimensions(&self) -> (f64, f64) {
        match *self {
            Self::Circle { hoop_diameter } => (hoop_diameter, hoop_diameter),
            Self::Rectangle { width, height } => (width, height),
        }
    }

    pub fn max_dimension(&self) -> f64 {
        let (width, height) = self.dimensions();
        width.max(height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        let (width, height) = self.dimensions();
        width / height
    }

    /// Pixel grid for a processing `resolution`. The longer side gets exactly
    /// `resolution` pixels, the shorter one follows the aspect ratio.
    pub fn grid(&self, resolution: u32) -> Grid {
        let (width, height) = self.dimensions();
        let resolution = resolution as usize;
        let scaled = |short: f64, long: f64| ((resolution as f64 * short / long).round() as usize).max(1);
        if width >= height {
            Grid::new(scaled(height, width), resolution)
        } else {
            Grid::new(resolution, scaled(width, height))
        }
    }
}

/// Every knob of a generation run. Missing fields take their defaults when
/// deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub shape: TableShape,
    pub nail_count: usize,
    pub line_count: usize,
    /// Ink removed from the error matrix per line. Replaced by the value derived
    /// from [`Self::yarn`] when one is given.
    pub line_weight: u32,
    /// Minimum index separation between two linked nails.
    pub min_nail_distance: usize,
    /// Pixel length of the longer side of the processed image.
    pub resolution: u32,
    pub yarn: Option<yarn::Yarn>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            shape: TableShape::default(),
            nail_count: 288,
            line_count: 4000,
            line_weight: 20,
            min_nail_distance: 20,
            resolution: 500,
            yarn: None,
        }
    }
}

impl Parameters {
    pub fn grid(&self) -> Grid {
        self.shape.grid(self.resolution)
    }

    /// Millimeters covered by one pixel.
    pub fn mm_per_pixel(&self) -> f64 {
        self.shape.max_dimension() / self.resolution as f64
    }

    /// Line weight as applied to the error matrix.
    pub fn ink_weight(&self) -> u8 {
        self.line_weight.clamp(1, 255) as u8
    }

    /// Copy with the line weight derived from the yarn, if any.
    pub fn resolve(&self) -> Result<Self, yarn::Error> {
        let mut resolved = self.clone();
        if let Some(yarn) = &self.yarn {
            resolved.line_weight =
                yarn.line_weight(self.shape.max_dimension(), self.resolution)? as u32;
        }
        Ok(resolved)
    }

    /// Every problem found, in field order. Empty when the parameters are usable.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !NAIL_COUNT_RANGE.contains(&self.nail_count) {
            errors.push(ValidationError::NailCount(self.nail_count));
        }
        if !LINE_COUNT_RANGE.contains(&self.line_count) {
            errors.push(ValidationError::LineCount(self.line_count));
        }
        if !LINE_WEIGHT_RANGE.contains(&self.line_weight) {
            errors.push(ValidationError::LineWeight(self.line_weight));
        }
        if !RESOLUTION_RANGE.contains(&self.resolution) {
            errors.push(ValidationError::Resolution(self.resolution));
        }
        if !MIN_NAIL_DISTANCE_RANGE.contains(&self.min_nail_distance) {
            errors.push(ValidationError::MinNailDistance(self.min_nail_distance));
        }
        let (width, height) = self.shape.dimensions();
        for value in [width, height] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(ValidationError::Dimension(value));
                break;
            }
        }
        if let Some(Err(err)) = self.yarn.as_ref().map(yarn::Yarn::diameter_mm) {
            errors.push(ValidationError::Yarn(err));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Nail count must be between {min} and {max}, got {0}", min = NAIL_COUNT_RANGE.start(), max = NAIL_COUNT_RANGE.end())]
    NailCount(usize),
    #[error("Line count must be between {min} and {max}, got {0}", min = LINE_COUNT_RANGE.start(), max = LINE_COUNT_RANGE.end())]
    LineCount(usize),
    #[error("Line weight must be between {min} and {max}, got {0}", min = LINE_WEIGHT_RANGE.start(), max = LINE_WEIGHT_RANGE.end())]
    LineWeight(u32),
    #[error("Resolution must be between {min} and {max} pixels, got {0}", min = RESOLUTION_RANGE.start(), max = RESOLUTION_RANGE.end())]
    Resolution(u32),
    #[error("Minimum nail distance must be between {min} and {max}, got {0}", min = MIN_NAIL_DISTANCE_RANGE.start(), max = MIN_NAIL_DISTANCE_RANGE.end())]
    MinNailDistance(usize),
    #[error("Table dimensions must be positive, got {0}mm")]
    Dimension(f64),
    #[error(transparent)]
    Yarn(yarn::Error),
}
