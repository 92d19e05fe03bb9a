use std::ops::Range;

use thiserror::Error;

/// Index distance rules between nails laid out on a closed loop.
#[derive(Clone, Copy, Debug)]
pub struct NailDistancer {
    count: usize,
    min: usize,
}

impl NailDistancer {
    pub fn new(count: usize, distance: usize) -> Result<Self, Error> {
        if distance == 0 {
            Err(Error)
        } else {
            Ok(Self {
                count,
                min: distance,
            })
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> usize {
        self.min
    }

    /// Offsets from the current nail that may be linked next, ascending. Empty
    /// when the loop is too short for the minimum distance.
    pub fn offsets(&self) -> Range<usize> {
        self.min..self.count.saturating_sub(self.min).max(self.min)
    }

    /// Nail reached walking `offset` positions forward from `nail_idx`.
    pub fn nail_at(&self, nail_idx: usize, offset: usize) -> usize {
        (nail_idx + offset) % self.count
    }

    /// Whether the pair gets a baked line. Linear on purpose: it covers every
    /// pair [`Self::is_valid`] accepts.
    pub fn is_baked(&self, a_idx: usize, b_idx: usize) -> bool {
        a_idx.abs_diff(b_idx) >= self.min
    }

    /// Shortest walk between two nails around the loop.
    pub fn circular_distance(&self, a_idx: usize, b_idx: usize) -> usize {
        let diff = a_idx.abs_diff(b_idx);
        diff.min(self.count - diff)
    }

    //NOTE: This does not check if a_idx and b_idx are inside bounds.
    pub fn is_valid(&self, a_idx: usize, b_idx: usize) -> bool {
        self.circular_distance(a_idx, b_idx) >= self.min
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("The minimum distance between nails must be at least 1.")]
pub struct Error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_leave_room_on_both_sides() {
        let distancer = NailDistancer::new(10, 3).unwrap();
        assert_eq!(distancer.offsets(), 3..7);
        assert_eq!(distancer.nail_at(8, 3), 1);
        assert!(NailDistancer::new(4, 2).unwrap().offsets().is_empty());
        assert!(NailDistancer::new(4, 7).unwrap().offsets().is_empty());
        assert!(NailDistancer::new(4, 0).is_err());
    }

    #[test]
    fn circular_distance_wraps() {
        let distancer = NailDistancer::new(10, 3).unwrap();
        assert_eq!(distancer.circular_distance(1, 9), 2);
        assert!(!distancer.is_valid(1, 9));
        assert!(distancer.is_baked(1, 9));
        assert!(distancer.is_valid(2, 8));
    }

    #[test]
    fn every_offset_is_valid_and_baked() {
        for count in 3..40 {
            for min in 1..20 {
                let distancer = NailDistancer::new(count, min).unwrap();
                for from in 0..count {
                    for offset in distancer.offsets() {
                        let to = distancer.nail_at(from, offset);
                        assert!(distancer.is_valid(from, to), "{count} {min} {from} {to}");
                        assert!(distancer.is_baked(from, to), "{count} {min} {from} {to}");
                    }
                }
            }
        }
    }
}
