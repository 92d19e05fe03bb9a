use std::{
    collections::VecDeque,
    ops::Range,
    time::{Duration, Instant},
};

use image::DynamicImage;
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::{
    buffer,
    darkness::{Darkness, FlatDarkness},
    geometry::{Point, Segment},
    image::{PixelData, SourceError},
    nail_table::{self, BakedLine, BakedNailTable, NailTable},
    params::Parameters,
    verboser::{Message, Progress, Verboser},
    yarn, Grid,
};

/// Recently visited nails that may not be linked again.
pub const RECENT_NAILS: usize = 20;
/// Lines drawn between two progress reports.
pub const PROGRESS_INTERVAL: usize = 10;

/// Ink still wanted per pixel, `255 - gray` at the start of a run.
pub type ErrorMatrix = PixelData<u8>;

impl ErrorMatrix {
    pub fn from_pixels(pixels: &PixelData<u8>) -> Self {
        pixels.map(|&value| 255 - value)
    }
}

/// Runs the whole pipeline on `source`: image processing, nail layout, line
/// baking and the greedy search.
///
/// The source must pass [`crate::image::check_source`]. Parameters are not
/// validated here, see [`Parameters::validate`].
#[tracing::instrument(skip_all, fields(nails = parameters.nail_count, lines = parameters.line_count))]
pub fn generate(
    source: &DynamicImage,
    parameters: &Parameters,
    verboser: &mut impl Verboser,
) -> Result<Computation, Error> {
    let start = Instant::now();
    let problems = crate::image::check_source(source.width(), source.height());
    if !problems.is_empty() {
        return Err(Error::Source(problems));
    }
    let parameters = parameters.resolve().map_err(Error::Yarn)?;
    let grid = parameters.grid();

    let pixels = crate::image::process(source, &parameters.shape, grid);
    let table = NailTable::new(&parameters.shape, grid, parameters.nail_count, verboser)
        .map_err(Error::NailTable)?;
    let table = BakedNailTable::new(table, parameters.min_nail_distance, verboser)
        .map_err(Error::NailTable)?;
    tracing::debug!(
        width = grid.width,
        height = grid.height,
        nails = table.nails().len(),
        lines = table.lines().len(),
        elapsed = ?start.elapsed(),
        "baked nail table"
    );

    let thread = Algorithm::new(
        &table,
        &pixels,
        parameters.line_count,
        FlatDarkness(parameters.ink_weight()),
        parameters.mm_per_pixel(),
    )?
    .compute(verboser);

    let elapsed = start.elapsed();
    tracing::debug!(
        lines = thread.sequence.len() - 1,
        thread_length = thread.length,
        ?elapsed,
        "computation finished"
    );
    Ok(Computation {
        nails: NailTable::from(table).nails().to_vec(),
        sequence: thread.sequence,
        thread_length: thread.length,
        state: thread.state,
        grid,
        parameters,
        elapsed,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Ready,
    Stepping,
    /// Every requested line was drawn.
    Done,
    /// No legal nail was left before reaching the requested line count.
    Stalled,
}

impl State {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Stalled)
    }
}

/// Output of [`Algorithm::compute`].
#[derive(Clone, Debug, PartialEq)]
pub struct Thread {
    pub sequence: Vec<usize>,
    /// Millimeters.
    pub length: f64,
    pub state: State,
}

/// Greedy line selection over a baked table.
///
/// Owns its error matrix; the table is only read, so several algorithms may
/// share one.
pub struct Algorithm<'a, D = FlatDarkness<u8>> {
    table: &'a BakedNailTable,
    errors: ErrorMatrix,
    darkness: D,
    line_count: usize,
    mm_per_pixel: f64,
    state: State,
    current: usize,
    sequence: Vec<usize>,
    recent: VecDeque<usize>,
    thread_length: f64,
    buffers: Vec<BatchBuffer>,
}

impl<'a, D: Darkness<u8>> Algorithm<'a, D> {
    pub fn new(
        table: &'a BakedNailTable,
        pixels: &PixelData<u8>,
        line_count: usize,
        darkness: D,
        mm_per_pixel: f64,
    ) -> Result<Self, Error> {
        if pixels.grid() != table.grid() {
            return Err(Error::GridMismatch {
                image: *pixels.grid(),
                table: *table.grid(),
            });
        }
        let mut sequence = Vec::with_capacity(line_count + 1);
        sequence.push(0);
        Ok(Self {
            table,
            errors: ErrorMatrix::from_pixels(pixels),
            darkness,
            line_count,
            mm_per_pixel,
            state: if line_count == 0 {
                State::Done
            } else {
                State::Ready
            },
            current: 0,
            sequence,
            recent: VecDeque::with_capacity(RECENT_NAILS + 1),
            thread_length: 0.0,
            buffers: BatchBuffer::new(rayon::current_num_threads()),
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn errors(&self) -> &ErrorMatrix {
        &self.errors
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn lines_drawn(&self) -> usize {
        self.sequence.len() - 1
    }

    pub fn thread_length(&self) -> f64 {
        self.thread_length
    }

    /// Draws one more line. Does nothing once the state is finished, so a
    /// caller can stop at any point simply by not stepping again.
    pub fn step(&mut self) -> State {
        if self.state.is_finished() {
            return self.state;
        }
        let Some(next) = self.get_best_line() else {
            self.state = State::Stalled;
            return self.state;
        };

        let grid = *self.errors.grid();
        if let Some(line) = self.table.line(self.current, next) {
            let errors = self.errors.pixels_mut();
            for idx in line.indexes(&grid) {
                errors[idx] = self.darkness.compute(errors[idx]);
            }
        }

        let nails = self.table.nails();
        let distance = nails[self.current]
            .as_::<f64>()
            .distance(&nails[next].as_());
        self.thread_length += distance * self.mm_per_pixel;

        self.sequence.push(next);
        self.recent.push_back(next);
        if self.recent.len() > RECENT_NAILS {
            self.recent.pop_front();
        }
        self.current = next;
        self.state = if self.lines_drawn() >= self.line_count {
            State::Done
        } else {
            State::Stepping
        };
        self.state
    }

    /// Steps until finished, reporting progress every [`PROGRESS_INTERVAL`]
    /// lines and on the last one.
    pub fn compute(mut self, verboser: &mut impl Verboser) -> Thread {
        while !self.state.is_finished() {
            let from = self.current;
            match self.step() {
                State::Stalled => {
                    tracing::warn!(
                        lines_drawn = self.lines_drawn(),
                        requested = self.line_count,
                        "no legal nail left, stopping early"
                    );
                    verboser.verbose(Message::Stalled {
                        lines_drawn: self.lines_drawn(),
                    });
                }
                state => {
                    let lines_drawn = self.lines_drawn();
                    if lines_drawn % PROGRESS_INTERVAL == 0 || state == State::Done {
                        verboser.verbose(Message::Computing(Progress {
                            lines_drawn,
                            total_lines: self.line_count,
                            percent_complete: lines_drawn as f64 * 100.0 / self.line_count as f64,
                            current_nail: from,
                            next_nail: self.current,
                            thread_length: self.thread_length,
                            sequence: &self.sequence,
                            nails: self.table.nails(),
                        }));
                    }
                }
            }
        }
        Thread {
            sequence: self.sequence,
            length: self.thread_length,
            state: self.state,
        }
    }

    /// Best scoring nail reachable from the current one.
    ///
    /// Offsets are split into contiguous chunks scored in parallel. Each chunk
    /// keeps its first best and chunks are merged in order, so ties always go
    /// to the smallest offset.
    fn get_best_line(&mut self) -> Option<usize> {
        let offsets = self.table.distancer().offsets();
        if offsets.is_empty() {
            return None;
        }
        let chunk_size = offsets.len().div_ceil(self.buffers.len());
        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            let start = (offsets.start + index * chunk_size).min(offsets.end);
            buffer.range = start..(start + chunk_size).min(offsets.end);
        }

        let table = self.table;
        let errors = &self.errors;
        let recent = &self.recent;
        let current = self.current;
        self.buffers.par_iter_mut().for_each(|buffer| {
            let distancer = table.distancer();
            buffer.result = buffer::first_max_by_key(
                buffer.range.clone().filter_map(|offset| {
                    let nail = distancer.nail_at(current, offset);
                    if recent.contains(&nail) {
                        return None;
                    }
                    table.line(current, nail).map(|line| Candidate {
                        nail,
                        score: score(line, errors),
                    })
                }),
                |candidate| candidate.score,
            );
        });

        buffer::first_max_by_key(
            self.buffers.iter().filter_map(|buffer| buffer.result),
            |candidate| candidate.score,
        )
        .map(|candidate| candidate.nail)
    }
}

/// Ink captured by `line`: the remaining error along it times its weight.
pub fn score(line: &BakedLine, errors: &ErrorMatrix) -> u64 {
    buffer::sum_at(errors.pixels(), line.indexes(errors.grid())) * line.weight() as u64
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    nail: usize,
    score: u64,
}

struct BatchBuffer {
    range: Range<usize>,
    result: Option<Candidate>,
}

impl BatchBuffer {
    fn new(count: usize) -> Vec<Self> {
        (0..count.max(1))
            .map(|_| Self {
                range: 0..0,
                result: None,
            })
            .collect()
    }
}

/// Finished run, ready to be rendered or shared.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Computation {
    /// Resolved parameters, with the line weight that was actually used.
    pub parameters: Parameters,
    pub nails: Vec<Point<u32>>,
    pub sequence: Vec<usize>,
    /// Millimeters.
    pub thread_length: f64,
    pub state: State,
    pub grid: Grid,
    pub elapsed: Duration,
}

impl Computation {
    pub fn lines_drawn(&self) -> usize {
        self.sequence.len().saturating_sub(1)
    }

    /// Segments in drawing order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<u32>> + '_ {
        self.sequence
            .windows(2)
            .map(|pair| Segment::new(self.nails[pair[0]], self.nails[pair[1]]))
    }

    pub fn build_svg(&self, line_tickness: f32) -> svg::Document {
        let mut doc =
            svg::Document::new().set("viewBox", (0, 0, self.grid.width, self.grid.height));
        doc = doc.add(
            svg::node::element::Rectangle::new()
                .set("width", self.grid.width)
                .set("height", self.grid.height)
                .set("fill", "white"),
        );
        for nail in self.nails.iter() {
            doc = doc.add(
                svg::node::element::Circle::new()
                    .set("cx", nail.x)
                    .set("cy", nail.y)
                    .set("r", 1)
                    .set("fill", "black"),
            );
        }

        for segment in self.segments() {
            doc = doc.add(
                svg::node::element::Line::new()
                    .set("x1", segment.start.x)
                    .set("y1", segment.start.y)
                    .set("x2", segment.end.x)
                    .set("y2", segment.end.y)
                    .set("stroke", "black")
                    .set("stroke-width", format!("{:.4}", line_tickness))
                    .set("stroke-opacity", 0.5),
            );
        }
        doc
    }

    /// Raster preview at `scale` times the processing grid, black thread on white.
    pub fn build_rgb(&self, scale: f64) -> image::RgbImage {
        let grid = Grid {
            height: ((self.grid.height as f64 * scale).round() as usize).max(1),
            width: ((self.grid.width as f64 * scale).round() as usize).max(1),
        };
        let max = grid.max_point();
        let to_scaled = |point: Point<u32>| {
            let scaled = (point.as_::<f64>() * scale).floor();
            Point {
                x: (scaled.x as u32).min(max.x),
                y: (scaled.y as u32).min(max.y),
            }
        };
        let mut buffer: Vec<u8> = vec![255; grid.len() * 3];
        for segment in self.segments() {
            let segment = Segment::new(to_scaled(segment.start), to_scaled(segment.end));
            for idx in grid.get_pixel_indexes_in_segment(segment) {
                buffer[3 * idx..3 * idx + 3].fill(0);
            }
        }
        image::RgbImage::from_vec(grid.width as u32, grid.height as u32, buffer)
            .unwrap_or_else(|| image::RgbImage::new(grid.width as u32, grid.height as u32))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    NailTable(nail_table::Error),
    #[error(transparent)]
    Yarn(yarn::Error),
    #[error("Unusable source image: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Source(Vec<SourceError>),
    #[error("Image grid {image:?} does not match the nail table grid {table:?}")]
    GridMismatch { image: Grid, table: Grid },
}
