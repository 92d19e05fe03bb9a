/// Sums the values of `buffer` found at `indexes`.
///
/// Indexes must be in bounds.
pub fn sum_at<T: Copy + Into<u64>>(buffer: &[T], indexes: impl IntoIterator<Item = usize>) -> u64 {
    indexes.into_iter().map(|idx| buffer[idx].into()).sum()
}

/// The item with the greatest key. Among equal keys the first one wins.
pub fn first_max_by_key<T, K: PartialOrd>(
    items: impl IntoIterator<Item = T>,
    mut key: impl FnMut(&T) -> K,
) -> Option<T> {
    let mut best: Option<(K, T)> = None;
    for item in items {
        let k = key(&item);
        match &best {
            Some((best_key, _)) if !(k > *best_key) => {}
            _ => best = Some((k, item)),
        }
    }
    best.map(|(_, item)| item)
}

/// Position of the greatest value, the first one on ties.
pub fn argmax<T: PartialOrd + Copy>(values: &[T]) -> Option<usize> {
    first_max_by_key(values.iter().enumerate(), |(_, value)| **value).map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_selected_values() {
        let buffer = [1u8, 2, 3, 4, 255];
        assert_eq!(sum_at(&buffer, [0, 4, 4]), 511);
        assert_eq!(sum_at(&buffer, []), 0);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[3, 7, 1, 7]), Some(1));
        assert_eq!(argmax(&[0u64, 0, 0]), Some(0));
        assert_eq!(argmax::<u8>(&[]), None);
    }

    #[test]
    fn first_max_by_key_keeps_item() {
        let items = [("a", 2), ("b", 5), ("c", 5)];
        assert_eq!(first_max_by_key(items, |(_, score)| *score), Some(("b", 5)));
    }
}
