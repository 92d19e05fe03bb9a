use serde::{Deserialize, Serialize};

use crate::geometry::Point;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T = usize> {
    pub height: T,
    pub width: T,
}

impl<T> Grid<T> {
    pub fn new(height: T, width: T) -> Self {
        Self { height, width }
    }
}

impl Grid {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bottom-right pixel of the grid.
    pub fn max_point(&self) -> Point<u32> {
        Point {
            x: self.width.saturating_sub(1) as u32,
            y: self.height.saturating_sub(1) as u32,
        }
    }

    pub fn index_of(&self, point: Point<u32>) -> Option<usize> {
        let (x, y) = (point.x as usize, point.y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Row-major index of `point`. Out of bounds points alias other pixels.
    pub fn index_of_unchecked(&self, point: Point<u32>) -> usize {
        point.y as usize * self.width + point.x as usize
    }

    pub fn get_pixel_indexes_in_segment(
        &self,
        segment: crate::geometry::Segment<u32>,
    ) -> impl Iterator<Item = usize> + '_ {
        segment
            .points_between()
            .filter_map(|point| self.index_of(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_row_major() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.index_of(Point::new(1, 2)), Some(9));
        assert_eq!(grid.index_of(Point::new(4, 0)), None);
        assert_eq!(grid.index_of(Point::new(0, 3)), None);
        assert_eq!(grid.max_point(), Point::new(3, 2));
    }
}
