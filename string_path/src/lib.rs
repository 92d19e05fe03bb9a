pub mod geometry {
    pub mod point;
    pub mod segment;

    pub use point::Point;
    pub use segment::Segment;
}

mod algorithm;
pub mod buffer;
pub mod darkness;
mod float;
pub mod grid;
pub mod image;
pub mod nail_distancer;
pub mod nail_table;
pub mod params;
pub mod share;
pub mod verboser;
pub mod yarn;

pub use algorithm::*;
pub use darkness::{Darkness, FlatDarkness};
pub use float::Float;
pub use grid::Grid;
pub use self::image::PixelData;
pub use nail_distancer::NailDistancer;
pub use nail_table::{BakedLine, BakedNailTable, NailTable};
pub use params::{Parameters, TableShape};
pub use verboser::Verboser;
