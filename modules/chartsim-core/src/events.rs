//! Declarative discrete events: preconditions, draws, and the effects they
//! apply to counters, distributions and the alert feed.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::sample::IntRange;

/// Resource check evaluated before an event runs. A failed check skips the
/// event silently.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Counter must be greater than zero.
    Positive(String),
    /// `counter` must be strictly greater than `other`.
    Exceeds { counter: String, other: String },
    /// At least one alert must be unresolved.
    UnresolvedAlert,
}

/// The event's magnitude, drawn once and shared by all its effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Draw {
    Uniform(IntRange),
    /// Product of two independent draws, e.g. price × quantity.
    Product(IntRange, IntRange),
}

impl Draw {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match self {
            Self::Uniform(range) => range.sample(rng),
            Self::Product(a, b) => a.sample(rng).saturating_mul(b.sample(rng)),
        }
    }

    pub fn ranges(&self) -> Vec<&IntRange> {
        match self {
            Self::Uniform(range) => vec![range],
            Self::Product(a, b) => vec![a, b],
        }
    }
}

/// Signed change applied by an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Fixed(i64),
    Amount,
    NegAmount,
    /// Share of the drawn amount, truncated.
    Fraction(f64),
}

impl Delta {
    pub fn uses_amount(&self) -> bool {
        !matches!(self, Self::Fixed(_))
    }

    pub fn resolve(&self, amount: i64) -> i64 {
        match self {
            Self::Fixed(v) => *v,
            Self::Amount => amount,
            Self::NegAmount => amount.saturating_neg(),
            Self::Fraction(share) => (amount as f64 * share) as i64,
        }
    }
}

/// Keyword classification of a subject into a category name.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    rules: Vec<(Vec<String>, String)>,
    fallback: String,
}

impl Classifier {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Map subjects containing any of `keywords` (case-insensitive) to
    /// `category`. Rules are tried in order.
    pub fn rule(mut self, keywords: &[&str], category: impl Into<String>) -> Self {
        self.rules.push((
            keywords.iter().map(|k| k.to_lowercase()).collect(),
            category.into(),
        ));
        self
    }

    pub fn classify(&self, subject: &str) -> &str {
        let subject = subject.to_lowercase();
        self.rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| subject.contains(k.as_str())))
            .map(|(_, category)| category.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .map(|(_, c)| c.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
    }
}

/// How a transfer chooses its category.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryPick {
    Fixed(String),
    Uniform(Vec<String>),
    /// Classify the event's subject.
    Classified(Classifier),
}

impl CategoryPick {
    pub fn fixed(name: impl Into<String>) -> Self {
        Self::Fixed(name.into())
    }

    pub fn uniform(names: &[&str]) -> Self {
        Self::Uniform(names.iter().map(|n| n.to_string()).collect())
    }

    /// Every category name this pick can produce.
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::Fixed(name) => vec![name.as_str()],
            Self::Uniform(names) => names.iter().map(String::as_str).collect(),
            Self::Classified(classifier) => classifier.categories().collect(),
        }
    }

    pub fn resolve<'a, R: Rng + ?Sized>(
        &'a self,
        subject: Option<&str>,
        rng: &mut R,
    ) -> Option<&'a str> {
        match self {
            Self::Fixed(name) => Some(name.as_str()),
            Self::Uniform(names) => names.choose(rng).map(String::as_str),
            Self::Classified(classifier) => subject.map(|s| classifier.classify(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Counter {
        name: String,
        delta: Delta,
    },
    Transfer {
        distribution: String,
        category: CategoryPick,
        delta: Delta,
    },
    RaiseAlert,
    ResolveAlert,
}

impl Effect {
    pub fn counter(name: impl Into<String>, delta: Delta) -> Self {
        Self::Counter {
            name: name.into(),
            delta,
        }
    }

    pub fn transfer(distribution: impl Into<String>, category: CategoryPick, delta: Delta) -> Self {
        Self::Transfer {
            distribution: distribution.into(),
            category,
            delta,
        }
    }

    pub fn uses_amount(&self) -> bool {
        match self {
            Self::Counter { delta, .. } | Self::Transfer { delta, .. } => delta.uses_amount(),
            Self::RaiseAlert | Self::ResolveAlert => false,
        }
    }
}

/// A named, weighted simulated occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpec {
    pub name: String,
    pub requires: Vec<Precondition>,
    pub chance: f64,
    pub amount: Option<Draw>,
    pub subject: Option<Vec<String>>,
    /// Named vocabularies drawn for the activity log only.
    pub details: Vec<(String, Vec<String>)>,
    pub effects: Vec<Effect>,
}

impl EventSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            chance: 1.0,
            amount: None,
            subject: None,
            details: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn requires(mut self, precondition: Precondition) -> Self {
        self.requires.push(precondition);
        self
    }

    pub fn chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    pub fn amount(mut self, draw: Draw) -> Self {
        self.amount = Some(draw);
        self
    }

    pub fn subject(mut self, vocabulary: &[&str]) -> Self {
        self.subject = Some(vocabulary.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, vocabulary: &[&str]) -> Self {
        self.details
            .push((key.into(), vocabulary.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn produce() -> Classifier {
        Classifier::new("Pulses")
            .rule(&["rice", "wheat", "barley"], "Cereals")
            .rule(&["onion", "tomato", "potato", "carrot"], "Vegetables")
    }

    #[test]
    fn classifier_matches_keywords_case_insensitively() {
        let c = produce();
        assert_eq!(c.classify("Basmati Rice"), "Cereals");
        assert_eq!(c.classify("Fresh Onions"), "Vegetables");
        assert_eq!(c.classify("Moong Dal"), "Pulses");
    }

    #[test]
    fn classifier_lists_every_reachable_category() {
        let classifier = produce();
        let cats: Vec<_> = classifier.categories().collect();
        assert_eq!(cats, vec!["Cereals", "Vegetables", "Pulses"]);
    }

    #[test]
    fn delta_resolution() {
        assert_eq!(Delta::Fixed(-1).resolve(500), -1);
        assert_eq!(Delta::Amount.resolve(500), 500);
        assert_eq!(Delta::NegAmount.resolve(500), -500);
        assert_eq!(Delta::Fraction(0.05).resolve(1999), 99);
    }

    #[test]
    fn product_draw_stays_within_bounds() {
        let draw = Draw::Product(IntRange::new(20, 3000), IntRange::new(10, 200));
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..500 {
            let v = draw.sample(&mut rng);
            assert!((200..=600_000).contains(&v));
        }
    }

    #[test]
    fn classified_pick_needs_a_subject() {
        let pick = CategoryPick::Classified(produce());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick.resolve(None, &mut rng), None);
        assert_eq!(pick.resolve(Some("Wheat"), &mut rng), Some("Cereals"));
    }
}
