use crate::{geometry::Point, Grid};
use std::ops::Deref;

mod process;

pub use process::{
    check_source, crop_to_aspect, flatten, grayscale, mask_circle, process, SourceError,
    MAX_ASPECT_RATIO, MIN_SOURCE_DIMENSION,
};

/// Row-major pixel storage addressed through a [`Grid`].
#[derive(Clone, Debug, PartialEq)]
pub struct PixelData<T> {
    pixels: Vec<T>,
    grid: Grid,
}

impl<T> PixelData<T> {
    /// Wraps already laid out pixels. `None` if the length does not match the grid.
    pub fn from_raw(pixels: Vec<T>, grid: Grid) -> Option<Self> {
        (pixels.len() == grid.len()).then_some(Self { pixels, grid })
    }

    pub fn new(builder: impl FnMut(Point<u32>) -> T, grid: Grid) -> Self {
        let pixels = (0..grid.height as u32)
            .flat_map(|y| (0..grid.width as u32).map(move |x| Point { x, y }))
            .map(builder)
            .collect();
        Self { pixels, grid }
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    pub fn get(&self, index: impl ImageIndexer) -> Option<&T> {
        index.get(self)
    }

    pub fn get_mut(&mut self, index: impl ImageIndexer) -> Option<&mut T> {
        index.get_mut(self)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> PixelData<U> {
        PixelData {
            pixels: self.pixels.iter().map(f).collect(),
            grid: self.grid,
        }
    }
}

impl<T> Deref for PixelData<T> {
    type Target = Grid;

    fn deref(&self) -> &Self::Target {
        &self.grid
    }
}

pub trait ImageIndexer {
    fn get_mut<T>(self, image: &mut PixelData<T>) -> Option<&mut T>;

    fn get<T>(self, image: &PixelData<T>) -> Option<&T>;
}

impl ImageIndexer for usize {
    fn get_mut<T>(self, image: &mut PixelData<T>) -> Option<&mut T> {
        image.pixels.get_mut(self)
    }

    fn get<T>(self, image: &PixelData<T>) -> Option<&T> {
        image.pixels.get(self)
    }
}

impl ImageIndexer for Point<u32> {
    fn get_mut<T>(self, image: &mut PixelData<T>) -> Option<&mut T> {
        image
            .grid
            .index_of(self)
            .and_then(|index| image.pixels.get_mut(index))
    }

    fn get<T>(self, image: &PixelData<T>) -> Option<&T> {
        image
            .grid
            .index_of(self)
            .and_then(|index| image.pixels.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_row_major() {
        let data = PixelData::new(|p| (p.y * 10 + p.x) as u8, Grid::new(2, 3));
        assert_eq!(data.pixels(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(data.get(Point::new(2, 1)), Some(&12));
        assert_eq!(data.get(Point::new(3, 1)), None);
        assert_eq!(data.get(4usize), Some(&11));
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(PixelData::from_raw(vec![0u8; 5], Grid::new(2, 3)).is_none());
        assert!(PixelData::from_raw(vec![0u8; 6], Grid::new(2, 3)).is_some());
    }
}
