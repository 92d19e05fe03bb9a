use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use super::Point;
use crate::Float;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment<T> {
    pub start: Point<T>,
    pub end: Point<T>,
}

impl<T> Segment<T> {
    pub const fn new(start: Point<T>, end: Point<T>) -> Self {
        Self { start, end }
    }

    pub fn as_<I: Copy + 'static>(self) -> Segment<I>
    where
        T: AsPrimitive<I>,
    {
        Segment {
            start: self.start.as_(),
            end: self.end.as_(),
        }
    }
}

impl<T: Float> Segment<T> {
    pub fn length(&self) -> T {
        self.start.distance(&self.end)
    }
}

impl Segment<u32> {
    /// Euclidean length floored to whole pixels. Also the number of points
    /// yielded by [`Self::points_between`].
    pub fn pixel_length(&self) -> usize {
        self.as_::<f64>().length().floor() as usize
    }

    /// Samples [`Self::pixel_length`] points evenly from `start` to `end`,
    /// both ends included.
    pub fn points_between(&self) -> impl Iterator<Item = Point<u32>> {
        let count = self.pixel_length();
        linspace(self.start.x, self.end.x, count)
            .zip(linspace(self.start.y, self.end.y, count))
            .map(|(x, y)| Point { x, y })
    }
}

/// `count` values interpolated between `start` and `end` and floored.
///
/// A single sample yields `start`, zero samples yield nothing. Every value lies
/// between `start` and `end`, so sampling between two in-bounds pixels never
/// leaves the grid.
pub fn linspace(start: u32, end: u32, count: usize) -> impl Iterator<Item = u32> {
    let last = count.saturating_sub(1) as u64;
    (0..count as u64).map(move |i| {
        if last == 0 {
            start
        } else {
            ((i * end as u64 + (last - i) * start as u64) / last) as u32
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        let values: Vec<_> = linspace(2, 10, 5).collect();
        assert_eq!(values, [2, 4, 6, 8, 10]);
    }

    #[test]
    fn linspace_floors_and_runs_backwards() {
        let values: Vec<_> = linspace(10, 0, 4).collect();
        assert_eq!(values, [10, 6, 3, 0]);
    }

    #[test]
    fn linspace_degenerate_counts() {
        assert_eq!(linspace(7, 9, 1).collect::<Vec<_>>(), [7]);
        assert_eq!(linspace(7, 9, 0).count(), 0);
    }

    #[test]
    fn points_between_matches_pixel_length() {
        let segment = Segment::new(Point::new(0, 0), Point::new(30, 40));
        assert_eq!(segment.pixel_length(), 50);
        let points: Vec<_> = segment.points_between().collect();
        assert_eq!(points.len(), 50);
        assert_eq!(points[0], Point::new(0, 0));
        assert_eq!(points[49], Point::new(30, 40));
    }

    #[test]
    fn reversed_segment_has_same_sample_count() {
        let a = Segment::new(Point::new(3, 17), Point::new(91, 40));
        let b = Segment::new(a.end, a.start);
        assert_eq!(a.points_between().count(), b.points_between().count());
        assert_eq!(b.points_between().next(), Some(a.end));
    }
}
