pub trait Darkness<S>: Send + Sync {
    fn compute(&self, weight: S) -> S;
}

/// Removes a fixed amount of ink, never going below zero.
#[derive(Clone, Copy, Debug)]
pub struct FlatDarkness<S>(pub S);

impl Darkness<u8> for FlatDarkness<u8> {
    fn compute(&self, weight: u8) -> u8 {
        weight.saturating_sub(self.0)
    }
}
