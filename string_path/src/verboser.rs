use crate::geometry::Point;

/// Snapshot of a running computation.
#[derive(Clone, Copy, Debug)]
pub struct Progress<'a> {
    pub lines_drawn: usize,
    pub total_lines: usize,
    pub percent_complete: f64,
    pub current_nail: usize,
    pub next_nail: usize,
    /// Thread used so far, in millimeters.
    pub thread_length: f64,
    pub sequence: &'a [usize],
    pub nails: &'a [Point<u32>],
}

#[derive(Clone, Copy, Debug)]
pub enum Message<'a> {
    CreatingNails(usize),
    Baking(usize),
    Computing(Progress<'a>),
    Stalled { lines_drawn: usize },
}

pub trait Verboser {
    fn verbose(&mut self, message: Message);
}

pub struct Silent;

impl Verboser for Silent {
    fn verbose(&mut self, _: Message) {}
}

impl<F: FnMut(Message)> Verboser for F {
    fn verbose(&mut self, message: Message) {
        self(message)
    }
}
