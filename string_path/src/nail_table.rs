use std::ops::Deref;

use num_traits::{AsPrimitive, ToPrimitive};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    buffer,
    geometry::{Point, Segment},
    grid::Grid,
    nail_distancer::{self, NailDistancer},
    params::TableShape,
    verboser::{Message, Verboser},
    Float,
};

/// Nail positions, in pixels of the processed image.
#[derive(Clone, Debug)]
pub struct NailTable {
    nails: Vec<Point<u32>>,
    grid: Grid,
}

impl NailTable {
    /// Lays out the nails for `shape`. Rectangles may end up with a slightly
    /// different count, see [`Self::rectangle`].
    pub fn new(
        shape: &TableShape,
        grid: Grid,
        nail_count: usize,
        verboser: &mut impl Verboser,
    ) -> Result<Self, Error> {
        if nail_count < 3 {
            return Err(Error::MinNailCount);
        }
        if grid.is_empty() {
            return Err(Error::EmptyGrid);
        }
        let table = match *shape {
            TableShape::Circle { .. } => Self::ellipse::<f64>(grid, nail_count),
            TableShape::Rectangle { width, height } => {
                Self::rectangle(grid, nail_count, width, height)
            }
        };
        verboser.verbose(Message::CreatingNails(table.nails.len()));
        Ok(table)
    }

    /// Evenly spaced nails on the ellipse inscribed in the grid, half a pixel
    /// inside so the extreme nails stay in bounds. Starts at angle zero.
    pub fn ellipse<S: Float + AsPrimitive<u32>>(grid: Grid, nail_count: usize) -> Self
    where
        usize: AsPrimitive<S>,
    {
        let center = Point {
            x: grid.width.as_() * S::HALF,
            y: grid.height.as_() * S::HALF,
        };
        let radius = center - Point::new(S::HALF, S::HALF);
        let nails = (0..nail_count)
            .map(|i| {
                let theta: S = S::TWO * S::PI * i.as_() / nail_count.as_();
                let offset = Point {
                    x: radius.x * theta.cos(),
                    y: radius.y * theta.sin(),
                };
                (center + offset).floor().as_()
            })
            .collect();
        Self { nails, grid }
    }

    /// Nails along the border of the grid with one on every corner, clockwise
    /// from the top-left one.
    ///
    /// Half of `nail_count` is split between the sides proportionally to the
    /// physical `width` and `height`, so the final count is
    /// `2 * (per_width + per_height)` and can differ from the request when
    /// corners and proportions do not allow an exact match.
    pub fn rectangle(grid: Grid, nail_count: usize, width: f64, height: f64) -> Self {
        let (per_width, per_height) = split_sides(nail_count / 2, width, height);
        let max = grid.max_point();
        let along = |idx: usize, count: usize, len: u32| -> u32 {
            (idx as u64 * len as u64 / count as u64) as u32
        };

        let mut nails = Vec::with_capacity(2 * (per_width + per_height));
        nails.extend((0..=per_width).map(|i| Point::new(along(i, per_width, max.x), 0)));
        nails.extend((1..per_height).map(|i| Point::new(max.x, along(i, per_height, max.y))));
        nails.extend(
            (0..=per_width)
                .rev()
                .map(|i| Point::new(along(i, per_width, max.x), max.y)),
        );
        nails.extend(
            (1..per_height)
                .rev()
                .map(|i| Point::new(0, along(i, per_height, max.y))),
        );
        Self { nails, grid }
    }

    pub fn nails(&self) -> &[Point<u32>] {
        &self.nails
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/// Segments per side for `half` nails, proportional to the side lengths. The
/// rounding remainder goes to the side that lost the larger fraction, and each
/// side keeps at least one segment.
fn split_sides(half: usize, width: f64, height: f64) -> (usize, usize) {
    let exact_width = half as f64 * width / (width + height);
    let exact_height = half as f64 * height / (width + height);
    let mut per_width = exact_width.floor().to_usize().unwrap_or(0);
    let mut per_height = exact_height.floor().to_usize().unwrap_or(0);
    if per_width + per_height < half {
        let fractions = [exact_width.fract(), exact_height.fract()];
        match buffer::argmax(&fractions) {
            Some(1) => per_height += 1,
            _ => per_width += 1,
        }
    }
    (per_width.max(1), per_height.max(1))
}

/// A nail table with every eligible line rasterized in advance.
///
/// Lines live once in an arena; the `n * n` index maps both `(a, b)` and
/// `(b, a)` to the same entry. Read only once built, so one table can be shared
/// by several runs.
pub struct BakedNailTable {
    table: NailTable,
    lines: Vec<BakedLine>,
    index: Vec<Option<u32>>,
    distancer: NailDistancer,
}

impl BakedNailTable {
    pub fn new(
        table: NailTable,
        min_nail_distance: usize,
        verboser: &mut impl Verboser,
    ) -> Result<Self, Error> {
        let nail_count = table.nails.len();
        let distancer =
            NailDistancer::new(nail_count, min_nail_distance).map_err(Error::Distancer)?;
        let nails = &table.nails;

        let rows: Vec<Vec<(usize, BakedLine)>> = (0..nail_count)
            .into_par_iter()
            .map(|a_idx| {
                (a_idx + 1..nail_count)
                    .filter(|&b_idx| distancer.is_baked(a_idx, b_idx))
                    .map(|b_idx| {
                        let segment = Segment::new(nails[a_idx], nails[b_idx]);
                        (b_idx, BakedLine::from(segment))
                    })
                    .collect()
            })
            .collect();

        let mut lines = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        let mut index = vec![None; nail_count * nail_count];
        for (a_idx, row) in rows.into_iter().enumerate() {
            for (b_idx, line) in row {
                let id = Some(lines.len() as u32);
                index[a_idx * nail_count + b_idx] = id;
                index[b_idx * nail_count + a_idx] = id;
                lines.push(line);
            }
        }
        verboser.verbose(Message::Baking(lines.len()));

        Ok(Self {
            table,
            lines,
            index,
            distancer,
        })
    }

    /// Cached line between two nails, in either order.
    pub fn line(&self, a_idx: usize, b_idx: usize) -> Option<&BakedLine> {
        let n = self.table.nails.len();
        if a_idx >= n || b_idx >= n {
            return None;
        }
        self.index[a_idx * n + b_idx].map(|id| &self.lines[id as usize])
    }

    pub fn lines(&self) -> &[BakedLine] {
        &self.lines
    }

    pub fn distancer(&self) -> &NailDistancer {
        &self.distancer
    }
}

impl From<BakedNailTable> for NailTable {
    fn from(value: BakedNailTable) -> Self {
        value.table
    }
}

impl Deref for BakedNailTable {
    type Target = NailTable;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

/// Rasterized line between two nails.
#[derive(Clone, Debug, PartialEq)]
pub struct BakedLine {
    segment: Segment<u32>,
    xs: Vec<u32>,
    ys: Vec<u32>,
    weight: u32,
}

impl From<Segment<u32>> for BakedLine {
    fn from(segment: Segment<u32>) -> Self {
        let (xs, ys) = segment.points_between().map(|p| (p.x, p.y)).unzip();
        Self {
            segment,
            xs,
            ys,
            weight: 1,
        }
    }
}

impl BakedLine {
    pub fn segment(&self) -> &Segment<u32> {
        &self.segment
    }

    pub fn xs(&self) -> &[u32] {
        &self.xs
    }

    pub fn ys(&self) -> &[u32] {
        &self.ys
    }

    /// Pixel-space length, which is also the number of sampled pixels.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Score multiplier, 1 for every line for now.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn points(&self) -> impl Iterator<Item = Point<u32>> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| Point { x, y })
    }

    pub fn indexes<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = usize> + 'a {
        self.points().map(|point| grid.index_of_unchecked(point))
    }
}

impl Deref for BakedLine {
    type Target = Segment<u32>;

    fn deref(&self) -> &Self::Target {
        &self.segment
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Nail count must be greater or equal to 3")]
    MinNailCount,
    #[error("The image grid has no pixels")]
    EmptyGrid,
    #[error(transparent)]
    Distancer(nail_distancer::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verboser::Silent;

    fn circle(nails: usize, resolution: usize) -> NailTable {
        NailTable::ellipse::<f64>(Grid::new(resolution, resolution), nails)
    }

    #[test]
    fn circle_has_exact_count_in_bounds() {
        for count in [3, 4, 7, 288, 1000] {
            let table = circle(count, 500);
            assert_eq!(table.nails().len(), count);
            assert!(table.nails().iter().all(|p| p.x < 500 && p.y < 500));
        }
        let single = NailTable::ellipse::<f32>(Grid::new(300, 200), 90);
        assert_eq!(single.nails().len(), 90);
        assert!(single.nails().iter().all(|p| p.x < 200 && p.y < 300));
        let table = circle(4, 100);
        assert_eq!(
            table.nails(),
            &[
                Point::new(99, 50),
                Point::new(50, 99),
                Point::new(0, 50),
                // cos(3pi/2) is a hair below zero
                Point::new(49, 0)
            ]
        );
    }

    #[test]
    fn rectangle_snaps_corners() {
        let grid = Grid::new(200, 300);
        for requested in [3, 4, 10, 101, 288, 999] {
            let table = NailTable::rectangle(grid, requested, 600.0, 400.0);
            let nails = table.nails();
            let (w, h) = split_sides(requested / 2, 600.0, 400.0);
            assert_eq!(nails.len(), 2 * (w + h), "{requested}");
            assert_eq!(nails[0], Point::new(0, 0));
            assert_eq!(nails[w], Point::new(299, 0));
            assert_eq!(nails[w + h], Point::new(299, 199));
            assert_eq!(nails[2 * w + h], Point::new(0, 199));
            assert!(nails.iter().all(|p| grid.index_of(*p).is_some()));
        }
    }

    #[test]
    fn rectangle_split_is_proportional() {
        assert_eq!(split_sides(144, 600.0, 400.0), (86, 58));
        assert_eq!(split_sides(10, 1.0, 1.0), (5, 5));
        assert_eq!(split_sides(1, 1.0, 1.0), (1, 1));
        // 7 * 2/3 = 4.67 and 7 * 1/3 = 2.33
        assert_eq!(split_sides(7, 2.0, 1.0), (5, 2));
    }

    #[test]
    fn new_rejects_tiny_tables() {
        let grid = Grid::new(10, 10);
        let err = NailTable::new(&TableShape::default(), grid, 2, &mut Silent).unwrap_err();
        assert_eq!(err, Error::MinNailCount);
        let err = NailTable::new(&TableShape::default(), Grid::new(0, 0), 10, &mut Silent)
            .unwrap_err();
        assert_eq!(err, Error::EmptyGrid);
    }

    #[test]
    fn baked_lines_are_symmetric() {
        let baked = BakedNailTable::new(circle(30, 120), 4, &mut Silent).unwrap();
        for a in 0..30 {
            for b in 0..30 {
                let forward = baked.line(a, b);
                let backward = baked.line(b, a);
                assert_eq!(forward.is_some(), baked.distancer().is_baked(a, b));
                assert_eq!(forward.is_some(), a.abs_diff(b) >= 4);
                assert_eq!(forward.map(|l| l as *const _), backward.map(|l| l as *const _));
            }
        }
    }

    #[test]
    fn index_follows_the_baking_rule() {
        for (count, min) in [(9, 1), (9, 4), (9, 5), (25, 12)] {
            let baked = BakedNailTable::new(circle(count, 80), min, &mut Silent).unwrap();
            let baked_pairs = (0..count)
                .flat_map(|a| (0..count).map(move |b| (a, b)))
                .filter(|&(a, b)| baked.distancer().is_baked(a, b))
                .count();
            assert_eq!(baked_pairs, 2 * baked.lines().len(), "{count} {min}");
            for a in 0..count {
                for b in 0..count {
                    assert_eq!(
                        baked.line(a, b).is_some(),
                        baked.distancer().is_baked(a, b),
                        "{count} {min} {a} {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn baked_line_samples_floor_of_length() {
        let baked = BakedNailTable::new(circle(16, 200), 1, &mut Silent).unwrap();
        let nails = baked.nails();
        let line = baked.line(0, 8).unwrap();
        let distance = nails[0].as_::<f64>().distance(&nails[8].as_());
        assert_eq!(line.len(), distance.floor() as usize);
        assert_eq!(line.xs().len(), line.ys().len());
        assert_eq!(line.weight(), 1);
        assert_eq!(line.points().next(), Some(nails[0]));
        assert_eq!(line.points().last(), Some(nails[8]));
    }

    #[test]
    fn every_legal_move_is_baked() {
        for (count, min) in [(12, 1), (12, 5), (50, 20), (33, 7)] {
            let baked = BakedNailTable::new(circle(count, 200), min, &mut Silent).unwrap();
            let distancer = baked.distancer();
            for from in 0..count {
                for to in 0..count {
                    if from != to && distancer.is_valid(from, to) {
                        assert!(baked.line(from, to).is_some(), "{count} {min} {from} {to}");
                    }
                }
            }
        }
    }

    #[test]
    fn baking_reports_line_count() {
        let mut baked_lines = None;
        let mut verboser = |message: Message<'_>| {
            if let Message::Baking(count) = message {
                baked_lines = Some(count);
            }
        };
        let baked = BakedNailTable::new(circle(10, 100), 3, &mut verboser).unwrap();
        // pairs with index difference 3..=9
        assert_eq!(baked_lines, Some(28));
        assert_eq!(baked.lines().len(), 28);
    }
}
