//! Categorical distributions: a fixed set of named categories, each clamped
//! into its band after every change.

use std::collections::HashSet;

use rand::Rng;

use crate::error::ConfigError;
use crate::sample::{Drift, IntRange};
use crate::series::Bucket;

/// Inclusive clamp band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub min: u64,
    pub max: u64,
}

impl Band {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Lower bound only.
    pub const fn at_least(min: u64) -> Self {
        Self::new(min, u64::MAX)
    }

    pub const fn unbounded() -> Self {
        Self::at_least(0)
    }

    pub fn clamp(&self, value: u64) -> u64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Category {
    name: String,
    value: u64,
    band: Band,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDistribution {
    categories: Vec<Category>,
}

impl CategoryDistribution {
    /// Build a distribution. `overrides` replace the shared band for the
    /// named categories.
    pub fn new(
        name: &str,
        entries: &[(String, u64)],
        band: Band,
        overrides: &[(String, Band)],
    ) -> Result<Self, ConfigError> {
        check_band(name, band)?;
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(entries.len());
        for (category, value) in entries {
            if !seen.insert(category.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    name: name.to_string(),
                    label: category.clone(),
                });
            }
            let band = overrides
                .iter()
                .find(|(n, _)| n == category)
                .map(|(_, b)| *b)
                .unwrap_or(band);
            check_band(category, band)?;
            if !band.contains(*value) {
                return Err(ConfigError::ValueOutsideBand {
                    name: category.clone(),
                    value: *value,
                    min: band.min,
                    max: band.max,
                });
            }
            categories.push(Category {
                name: category.clone(),
                value: *value,
                band,
            });
        }
        for (category, _) in overrides {
            if !seen.contains(category.as_str()) {
                return Err(ConfigError::UnknownCategory {
                    distribution: name.to_string(),
                    category: category.clone(),
                });
            }
        }
        Ok(Self { categories })
    }

    pub fn get(&self, category: &str) -> Option<u64> {
        self.find(category).map(|c| c.value)
    }

    pub fn band(&self, category: &str) -> Option<Band> {
        self.find(category).map(|c| c.band)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.find(category).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Multiplicative drift on every category.
    pub fn drift<R: Rng + ?Sized>(&mut self, drift: &Drift, rng: &mut R) {
        for category in &mut self.categories {
            category.value = category.band.clamp(drift.apply(category.value, rng));
        }
    }

    /// Additive random delta on every category.
    pub fn jitter<R: Rng + ?Sized>(&mut self, range: &IntRange, rng: &mut R) {
        for category in &mut self.categories {
            let delta = range.sample(rng);
            category.value = category.band.clamp(category.value.saturating_add_signed(delta));
        }
    }

    /// Apply a signed delta to one category. Returns the new value, or `None`
    /// for an unknown category.
    pub fn transfer(&mut self, category: &str, delta: i64) -> Option<u64> {
        let entry = self.categories.iter_mut().find(|c| c.name == category)?;
        entry.value = entry.band.clamp(entry.value.saturating_add_signed(delta));
        Some(entry.value)
    }

    pub fn to_buckets(&self) -> Vec<Bucket> {
        self.categories
            .iter()
            .map(|c| Bucket::new(c.name.clone(), c.value))
            .collect()
    }

    fn find(&self, category: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == category)
    }
}

fn check_band(name: &str, band: Band) -> Result<(), ConfigError> {
    if band.min > band.max {
        return Err(ConfigError::InvertedBand {
            name: name.to_string(),
            min: band.min,
            max: band.max,
        });
    }
    Ok(())
}

/// Ambient per-tick update for a distribution.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionRule {
    Drift(Drift),
    Jitter(IntRange),
    Static,
}

impl DistributionRule {
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self {
            Self::Drift(drift) => drift.validate(name),
            Self::Jitter(range) => range.validate(name),
            Self::Static => Ok(()),
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, dist: &mut CategoryDistribution, rng: &mut R) {
        match self {
            Self::Drift(drift) => dist.drift(drift, rng),
            Self::Jitter(range) => dist.jitter(range, rng),
            Self::Static => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entries(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn transfer_clamps_to_band_floor() {
        let mut dist =
            CategoryDistribution::new("d", &entries(&[("A", 10), ("B", 10)]), Band::new(5, 15), &[])
                .unwrap();
        assert_eq!(dist.transfer("A", -20), Some(5));
        assert_eq!(dist.get("A"), Some(5));
        assert_eq!(dist.get("B"), Some(10));
    }

    #[test]
    fn transfer_clamps_to_band_ceiling_and_ignores_unknown() {
        let mut dist =
            CategoryDistribution::new("d", &entries(&[("A", 10)]), Band::new(5, 15), &[]).unwrap();
        assert_eq!(dist.transfer("A", i64::MAX), Some(15));
        assert_eq!(dist.transfer("Z", 1), None);
    }

    #[test]
    fn overrides_tighten_individual_categories() {
        let mut dist = CategoryDistribution::new(
            "farmers",
            &entries(&[("Local", 65), ("Distant", 10)]),
            Band::new(5, 80),
            &[("Distant".to_string(), Band::new(5, 15))],
        )
        .unwrap();
        for _ in 0..20 {
            dist.transfer("Distant", 1);
            dist.transfer("Local", 1);
        }
        assert_eq!(dist.get("Distant"), Some(15));
        assert_eq!(dist.get("Local"), Some(80));
    }

    #[test]
    fn band_holds_after_random_drift_jitter_and_transfers() {
        let band = Band::new(5, 50);
        let mut dist = CategoryDistribution::new(
            "crops",
            &entries(&[("Rice", 40), ("Wheat", 30), ("Vegetables", 20), ("Others", 10)]),
            band,
            &[],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let drift = Drift::new(-0.3, 0.4);
        let jitter = IntRange::new(-4, 6);
        for step in 0..2000 {
            match step % 3 {
                0 => dist.drift(&drift, &mut rng),
                1 => dist.jitter(&jitter, &mut rng),
                _ => {
                    let delta = rng.random_range(-30..=30);
                    dist.transfer("Rice", delta);
                }
            }
            for bucket in dist.to_buckets() {
                assert!(band.contains(bucket.value), "{} escaped: {}", bucket.name, bucket.value);
            }
        }
    }

    #[test]
    fn construction_rejects_bad_bands_and_values() {
        assert!(matches!(
            CategoryDistribution::new("d", &entries(&[("A", 1)]), Band::new(9, 3), &[]),
            Err(ConfigError::InvertedBand { .. })
        ));
        assert!(matches!(
            CategoryDistribution::new("d", &entries(&[("A", 1)]), Band::new(5, 15), &[]),
            Err(ConfigError::ValueOutsideBand { .. })
        ));
        assert!(matches!(
            CategoryDistribution::new(
                "d",
                &entries(&[("A", 10)]),
                Band::new(5, 15),
                &[("B".to_string(), Band::new(0, 1))]
            ),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn buckets_keep_declaration_order() {
        let dist = CategoryDistribution::new(
            "d",
            &entries(&[("Zeta", 1), ("Alpha", 2)]),
            Band::unbounded(),
            &[],
        )
        .unwrap();
        let names: Vec<_> = dist.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }
}
