//! Weighted event dispatcher: one uniform draw, cumulative thresholds.

use rand::Rng;

use crate::error::ConfigError;

/// A validated table of `(upper_bound, action)` pairs.
///
/// Bounds are cumulative, non-decreasing, and the last one is exactly 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDispatcher<A> {
    table: Vec<(f64, A)>,
}

impl<A> WeightedDispatcher<A> {
    pub fn new(table: Vec<(f64, A)>) -> Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::EmptyWeightTable);
        }
        let mut previous = 0.0;
        for (index, (bound, _)) in table.iter().enumerate() {
            let bound = *bound;
            if !(bound > 0.0 && bound <= 1.0) {
                return Err(ConfigError::BoundOutOfRange { index, bound });
            }
            if bound < previous {
                return Err(ConfigError::NonMonotonicBound {
                    index,
                    bound,
                    previous,
                });
            }
            previous = bound;
        }
        if previous != 1.0 {
            return Err(ConfigError::UnterminatedTable { last: previous });
        }
        Ok(Self { table })
    }

    /// First action whose bound exceeds `r`, for `r` in `[0, 1)`.
    pub fn select(&self, r: f64) -> &A {
        self.table
            .iter()
            .find(|(bound, _)| *bound > r)
            .map(|(_, action)| action)
            // r < 1.0 == last bound, so this only triggers on r outside [0, 1)
            .unwrap_or_else(|| &self.table[self.table.len() - 1].1)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &A {
        self.select(rng.random::<f64>())
    }

    pub fn actions(&self) -> impl Iterator<Item = &A> {
        self.table.iter().map(|(_, action)| action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Act {
        A,
        B,
        C,
    }

    fn table() -> WeightedDispatcher<Act> {
        WeightedDispatcher::new(vec![(0.3, Act::A), (0.5, Act::B), (1.0, Act::C)]).unwrap()
    }

    #[test]
    fn select_uses_first_exceeding_bound() {
        let d = table();
        assert_eq!(*d.select(0.0), Act::A);
        assert_eq!(*d.select(0.2999), Act::A);
        assert_eq!(*d.select(0.3), Act::B);
        assert_eq!(*d.select(0.4999), Act::B);
        assert_eq!(*d.select(0.5), Act::C);
        assert_eq!(*d.select(0.9999), Act::C);
    }

    #[test]
    fn empirical_frequencies_converge() {
        let d = table();
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match d.sample(&mut rng) {
                Act::A => counts[0] += 1,
                Act::B => counts[1] += 1,
                Act::C => counts[2] += 1,
            }
        }
        let freq = |i: usize| counts[i] as f64 / n as f64;
        // ~5 sigma at n = 100k
        assert!((freq(0) - 0.3).abs() < 0.01, "A = {}", freq(0));
        assert!((freq(1) - 0.2).abs() < 0.01, "B = {}", freq(1));
        assert!((freq(2) - 0.5).abs() < 0.01, "C = {}", freq(2));
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_eq!(
            WeightedDispatcher::<Act>::new(vec![]),
            Err(ConfigError::EmptyWeightTable)
        );
        assert!(matches!(
            WeightedDispatcher::new(vec![(0.5, Act::A), (0.4, Act::B), (1.0, Act::C)]),
            Err(ConfigError::NonMonotonicBound { index: 1, .. })
        ));
        assert!(matches!(
            WeightedDispatcher::new(vec![(0.5, Act::A), (0.8, Act::B)]),
            Err(ConfigError::UnterminatedTable { .. })
        ));
        assert!(matches!(
            WeightedDispatcher::new(vec![(0.0, Act::A), (1.0, Act::B)]),
            Err(ConfigError::BoundOutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            WeightedDispatcher::new(vec![(1.5, Act::A)]),
            Err(ConfigError::BoundOutOfRange { .. })
        ));
    }

    #[test]
    fn zero_width_entries_are_never_selected() {
        let d = WeightedDispatcher::new(vec![(0.5, Act::A), (0.5, Act::B), (1.0, Act::C)]).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..10_000 {
            assert_ne!(*d.sample(&mut rng), Act::B);
        }
    }
}
