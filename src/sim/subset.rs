//! Random subset selection without replacement

use rand::Rng;

/// Items picked by [`select_subset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset<T> {
    pub chosen: Vec<T>,
    /// What the caller asked for before clamping
    pub requested: usize,
}

impl<T> Subset<T> {
    /// True when the request exceeded the pool and was clamped
    pub fn was_clamped(&self) -> bool {
        self.requested > self.chosen.len()
    }
}

/// Pick `k` distinct items uniformly at random.
///
/// Each round takes a uniformly random index from the remaining pool and
/// removes it. Requests larger than the pool are clamped with a warning.
pub fn select_subset<T: Clone, R: Rng>(rng: &mut R, items: &[T], k: usize) -> Subset<T> {
    let take = if k > items.len() {
        log::warn!("requested {} of {} items, clamping to pool size", k, items.len());
        items.len()
    } else {
        k
    };

    let mut pool: Vec<usize> = (0..items.len()).collect();
    let mut chosen = Vec::with_capacity(take);
    for _ in 0..take {
        let pick = rng.random_range(0..pool.len());
        chosen.push(items[pool.remove(pick)].clone());
    }

    Subset { chosen, requested: k }
}
