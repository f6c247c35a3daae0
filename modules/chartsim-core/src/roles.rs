//! Built-in role catalog. Seed values, vocabularies and drift ranges match
//! the dashboards the collector renders.

use std::fmt;

use crate::alerts::{AlertKind, AlertSeed, AlertVocabulary};
use crate::config::{ActionSpec, AlertConfig, DistributionConfig, RoleConfig, SeriesConfig, SleepBand};
use crate::distribution::{Band, DistributionRule};
use crate::events::{CategoryPick, Classifier, Delta, Draw, Effect, EventSpec, Precondition};
use crate::sample::{Drift, IntRange};
use crate::series::{Period, SeriesRule};
use crate::snapshot::Scope;

const FIRST_HALF: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const VILLAGES: [&str; 5] = ["Khetri", "Rampur", "Bharatpur", "Alwar", "Jaipur"];
const FARMERS: [&str; 5] = [
    "Rajesh Kumar",
    "Sunita Devi",
    "Amit Singh",
    "Priya Sharma",
    "Vikram Patel",
];
const PRODUCTS: [&str; 6] = [
    "Basmati Rice",
    "Fresh Onions",
    "Wheat",
    "Tomatoes",
    "Potatoes",
    "Carrots",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Buyer,
    Farmer,
    Hub,
    Admin,
    Group,
}

impl RoleKind {
    pub const ALL: [RoleKind; 5] = [
        RoleKind::Buyer,
        RoleKind::Farmer,
        RoleKind::Admin,
        RoleKind::Hub,
        RoleKind::Group,
    ];

    pub fn default_actor_id(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer_001",
            Self::Farmer => "farmer_001",
            Self::Hub => "hub_001",
            Self::Admin => "admin_001",
            Self::Group => "shg_001",
        }
    }

    pub fn config(&self) -> RoleConfig {
        match self {
            Self::Buyer => buyer(),
            Self::Farmer => farmer(),
            Self::Hub => hub(),
            Self::Admin => admin(),
            Self::Group => group(),
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Farmer => write!(f, "farmer"),
            Self::Hub => write!(f, "hub"),
            Self::Admin => write!(f, "admin"),
            Self::Group => write!(f, "group"),
        }
    }
}

fn months(values: [u64; 6]) -> Vec<(&'static str, u64)> {
    FIRST_HALF.into_iter().zip(values).collect()
}

fn weekdays(values: [u64; 7]) -> Vec<(&'static str, u64)> {
    WEEKDAYS.into_iter().zip(values).collect()
}

fn monthly_drift(low: f64, high: f64, seed: (i64, i64)) -> SeriesRule {
    SeriesRule::Drift {
        drift: Drift::new(low, high),
        seed: IntRange::new(seed.0, seed.1),
        period: Period::Month,
    }
}

fn produce_categories() -> Classifier {
    Classifier::new("Pulses")
        .rule(&["rice", "wheat", "barley"], "Cereals")
        .rule(&["onion", "tomato", "potato", "carrot"], "Vegetables")
        .rule(&["apple", "banana", "orange", "mango"], "Fruits")
}

pub fn buyer() -> RoleConfig {
    RoleConfig::new("buyer", "buyer_001", Scope::Users, SleepBand::from_secs(2.0, 5.0))
        .counter("totalSpent", 285_000)
        .counter("activeOrders", 5)
        .counter("completedPurchases", 42)
        .counter("savedListings", 12)
        .series(SeriesConfig::new(
            "monthlySpending",
            &months([45_000, 52_000, 38_000, 61_000, 48_000, 41_000]),
            monthly_drift(-0.05, 0.10, (35_000, 65_000)),
        ))
        .distribution(DistributionConfig::new(
            "categorySpending",
            &[
                ("Cereals", 120_000),
                ("Vegetables", 85_000),
                ("Fruits", 45_000),
                ("Pulses", 35_000),
            ],
            Band::unbounded(),
            DistributionRule::Drift(Drift::new(-0.03, 0.08)),
        ))
        .on(
            0.4,
            ActionSpec::Event(
                EventSpec::new("new_purchase")
                    // agreed price × quantity
                    .amount(Draw::Product(IntRange::new(20, 3000), IntRange::new(10, 200)))
                    .subject(&PRODUCTS)
                    .detail("farmer", &FARMERS)
                    .effect(Effect::counter("totalSpent", Delta::Amount))
                    .effect(Effect::counter("completedPurchases", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "categorySpending",
                        CategoryPick::Classified(produce_categories()),
                        Delta::Amount,
                    )),
            ),
        )
        .on(
            0.6,
            ActionSpec::Event(
                EventSpec::new("order_completed")
                    .requires(Precondition::Positive("activeOrders".into()))
                    .chance(0.3)
                    .effect(Effect::counter("activeOrders", Delta::Fixed(-1)))
                    .effect(Effect::counter("completedPurchases", Delta::Fixed(1))),
            ),
        )
        .on(0.8, ActionSpec::Publish)
        .on(1.0, ActionSpec::Refresh)
}

pub fn farmer() -> RoleConfig {
    let crops = Classifier::new("Others")
        .rule(&["rice", "basmati"], "Rice")
        .rule(&["wheat"], "Wheat")
        .rule(&["tomato", "onion", "potato", "carrot", "cauliflower"], "Vegetables");

    RoleConfig::new("farmer", "farmer_001", Scope::Users, SleepBand::from_secs(3.0, 6.0))
        .counter("totalEarnings", 125_000)
        .counter("activeListings", 8)
        .counter("completedOrders", 24)
        .counter("pendingOrders", 3)
        .series(SeriesConfig::new(
            "monthlyEarnings",
            &months([15_000, 18_000, 22_000, 25_000, 28_000, 17_000]),
            monthly_drift(-0.10, 0.15, (12_000, 32_000)),
        ))
        .distribution(DistributionConfig::new(
            "cropDistribution",
            &[("Rice", 40), ("Wheat", 30), ("Vegetables", 20), ("Others", 10)],
            Band::new(5, 50),
            DistributionRule::Drift(Drift::new(-0.02, 0.03)),
        ))
        .on(
            0.3,
            ActionSpec::Event(
                EventSpec::new("new_listing")
                    .subject(&[
                        "Basmati Rice",
                        "Fresh Tomatoes",
                        "Wheat",
                        "Onions",
                        "Potatoes",
                        "Carrots",
                        "Cauliflower",
                    ])
                    .effect(Effect::counter("activeListings", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "cropDistribution",
                        CategoryPick::Classified(crops),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.5,
            ActionSpec::Event(
                EventSpec::new("listing_sold")
                    .requires(Precondition::Positive("activeListings".into()))
                    .chance(0.25)
                    .amount(Draw::Uniform(IntRange::new(5_000, 25_000)))
                    .effect(Effect::counter("activeListings", Delta::Fixed(-1)))
                    .effect(Effect::counter("completedOrders", Delta::Fixed(1)))
                    .effect(Effect::counter("totalEarnings", Delta::Amount)),
            ),
        )
        .on(
            0.7,
            // Shows up in the activity log only.
            ActionSpec::Event(
                EventSpec::new("bid_received")
                    .requires(Precondition::Positive("activeListings".into()))
                    .chance(0.3)
                    .amount(Draw::Uniform(IntRange::new(1_000, 5_000))),
            ),
        )
        .on(
            0.8,
            ActionSpec::Event(
                EventSpec::new("order_completed")
                    .requires(Precondition::Positive("pendingOrders".into()))
                    .chance(0.2)
                    .amount(Draw::Uniform(IntRange::new(3_000, 15_000)))
                    .effect(Effect::counter("pendingOrders", Delta::Fixed(-1)))
                    .effect(Effect::counter("completedOrders", Delta::Fixed(1)))
                    .effect(Effect::counter("totalEarnings", Delta::Amount)),
            ),
        )
        .on(1.0, ActionSpec::Publish)
}

pub fn hub() -> RoleConfig {
    let catchment = Classifier::new("Distant Areas")
        .rule(&["khetri", "rampur"], "Local Farmers")
        .rule(&["bharatpur", "alwar"], "Nearby Villages");

    RoleConfig::new("hub", "hub_001", Scope::Hubs, SleepBand::from_secs(3.0, 5.0))
        .counter("totalOrdersProcessed", 1_250)
        .counter("activeOrders", 45)
        .counter("completedOrders", 1_205)
        .counter("pendingPickups", 12)
        .counter("hubRevenue", 125_000)
        .series(SeriesConfig::new(
            "dailyOrders",
            &weekdays([45, 52, 38, 61, 48, 41, 35]),
            SeriesRule::Accumulate {
                add: IntRange::new(1, 5),
                period: Period::Weekday,
            },
        ))
        .series(SeriesConfig::new(
            "revenueByDay",
            &weekdays([8_500, 9_200, 6_800, 10_500, 8_800, 7_200, 6_100]),
            SeriesRule::Accumulate {
                add: IntRange::new(500, 2_000),
                period: Period::Weekday,
            },
        ))
        .distribution(DistributionConfig::new(
            "orderStatusDistribution",
            &[
                ("Pending Pickup", 12),
                ("In Transit", 18),
                ("Quality Check", 8),
                ("Delivered", 7),
            ],
            Band::unbounded(),
            DistributionRule::Jitter(IntRange::new(-2, 3)),
        ))
        .distribution(
            DistributionConfig::new(
                "farmerDistribution",
                &[
                    ("Local Farmers", 65),
                    ("Nearby Villages", 25),
                    ("Distant Areas", 10),
                ],
                Band::new(5, 80),
                DistributionRule::Drift(Drift::new(-0.02, 0.03)),
            )
            .override_band("Nearby Villages", Band::new(5, 30))
            .override_band("Distant Areas", Band::new(5, 15)),
        )
        .on(
            0.3,
            ActionSpec::Event(
                EventSpec::new("order_arrived")
                    .subject(&VILLAGES)
                    .detail("product", &PRODUCTS)
                    .detail("farmer", &FARMERS)
                    .effect(Effect::counter("totalOrdersProcessed", Delta::Fixed(1)))
                    .effect(Effect::counter("activeOrders", Delta::Fixed(1)))
                    .effect(Effect::counter("pendingPickups", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "farmerDistribution",
                        CategoryPick::Classified(catchment),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.5,
            ActionSpec::Event(
                EventSpec::new("order_pickup")
                    .requires(Precondition::Positive("pendingPickups".into()))
                    .chance(0.4)
                    .effect(Effect::counter("pendingPickups", Delta::Fixed(-1)))
                    .effect(Effect::transfer(
                        "orderStatusDistribution",
                        CategoryPick::fixed("In Transit"),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.7,
            ActionSpec::Event(
                EventSpec::new("order_delivered")
                    .requires(Precondition::Positive("activeOrders".into()))
                    .chance(0.3)
                    .amount(Draw::Uniform(IntRange::new(200, 1_000)))
                    .effect(Effect::counter("activeOrders", Delta::Fixed(-1)))
                    .effect(Effect::counter("completedOrders", Delta::Fixed(1)))
                    .effect(Effect::counter("hubRevenue", Delta::Amount))
                    .effect(Effect::transfer(
                        "orderStatusDistribution",
                        CategoryPick::fixed("Delivered"),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.8,
            ActionSpec::Event(
                EventSpec::new("quality_check")
                    .requires(Precondition::Positive("activeOrders".into()))
                    .chance(0.25)
                    .effect(Effect::transfer(
                        "orderStatusDistribution",
                        CategoryPick::fixed("Quality Check"),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(1.0, ActionSpec::Publish)
}

pub fn admin() -> RoleConfig {
    let roles = Classifier::new("Farmers")
        .rule(&["farmer"], "Farmers")
        .rule(&["buyer"], "Buyers")
        .rule(&["hub_operator"], "Hub Operators")
        .rule(&["shg_leader"], "SHG Leaders")
        .rule(&["aggregator"], "Aggregators");

    RoleConfig::new("admin", "admin_001", Scope::Dashboard, SleepBand::from_secs(2.0, 4.0))
        .counter("totalUsers", 15_420)
        .counter("totalTransactions", 8_945)
        .counter("platformRevenue", 2_850_000)
        .counter("activeListings", 1_250)
        .series(SeriesConfig::new(
            "userGrowth",
            &months([1_200, 1_450, 1_680, 1_920, 2_150, 2_380]),
            monthly_drift(-0.02, 0.08, (2_000, 3_000)),
        ))
        .series(SeriesConfig::new(
            "transactionVolume",
            &months([450_000, 520_000, 480_000, 610_000, 580_000, 650_000]),
            monthly_drift(-0.05, 0.12, (600_000, 800_000)),
        ))
        .distribution(DistributionConfig::new(
            "userDistribution",
            &[
                ("Farmers", 8_500),
                ("Buyers", 3_200),
                ("Hub Operators", 450),
                ("SHG Leaders", 2_800),
                ("Aggregators", 470),
            ],
            Band::at_least(100),
            DistributionRule::Drift(Drift::new(-0.01, 0.02)),
        ))
        .distribution(DistributionConfig::new(
            "revenueByCategory",
            &[
                ("Cereals", 1_200_000),
                ("Vegetables", 850_000),
                ("Fruits", 450_000),
                ("Pulses", 350_000),
            ],
            Band::unbounded(),
            DistributionRule::Drift(Drift::new(-0.03, 0.10)),
        ))
        .alerts(AlertConfig::system_alerts())
        .on(
            0.25,
            ActionSpec::Event(
                EventSpec::new("user_registered")
                    .subject(&["farmer", "buyer", "hub_operator", "shg_leader", "aggregator"])
                    .effect(Effect::counter("totalUsers", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "userDistribution",
                        CategoryPick::Classified(roles),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.45,
            ActionSpec::Event(
                EventSpec::new("transaction")
                    .amount(Draw::Uniform(IntRange::new(1_000, 50_000)))
                    .effect(Effect::counter("totalTransactions", Delta::Fixed(1)))
                    // platform fee
                    .effect(Effect::counter("platformRevenue", Delta::Fraction(0.05)))
                    .effect(Effect::transfer(
                        "revenueByCategory",
                        CategoryPick::uniform(&["Cereals", "Vegetables", "Fruits", "Pulses"]),
                        Delta::Amount,
                    )),
            ),
        )
        .on(
            0.55,
            ActionSpec::Event(
                EventSpec::new("listing_created")
                    .effect(Effect::counter("activeListings", Delta::Fixed(1))),
            ),
        )
        .on(
            0.70,
            ActionSpec::Event(EventSpec::new("system_alert").effect(Effect::RaiseAlert)),
        )
        .on(
            0.80,
            ActionSpec::Event(
                EventSpec::new("alert_resolved")
                    .requires(Precondition::UnresolvedAlert)
                    .chance(0.3)
                    .effect(Effect::ResolveAlert),
            ),
        )
        .on(1.0, ActionSpec::Publish)
}

pub fn group() -> RoleConfig {
    let income = ["Agricultural Sales", "Handicrafts", "Livestock", "Other Activities"];
    let funds = ["Emergency Fund", "Investment Fund", "Loan Fund", "Development Fund"];

    RoleConfig::new("group", "shg_001", Scope::Groups, SleepBand::from_secs(4.0, 7.0))
        .counter("totalMembers", 25)
        .counter("activeMembers", 22)
        .counter("collectiveEarnings", 185_000)
        .counter("groupSavings", 45_000)
        .counter("loansDisbursed", 8)
        .counter("loansRepaid", 5)
        .series(SeriesConfig::new(
            "monthlyEarnings",
            &months([12_000, 15_000, 18_000, 22_000, 25_000, 28_000]),
            monthly_drift(-0.08, 0.15, (15_000, 35_000)),
        ))
        .distribution(
            DistributionConfig::new(
                "memberContribution",
                &[
                    ("Regular Members", 18),
                    ("Active Contributors", 15),
                    ("New Members", 7),
                    ("Inactive Members", 3),
                ],
                Band::unbounded(),
                DistributionRule::Drift(Drift::new(-0.02, 0.03)),
            )
            .override_band("Active Contributors", Band::new(0, 25)),
        )
        .distribution(DistributionConfig::new(
            "incomeSources",
            &[
                ("Agricultural Sales", 45),
                ("Handicrafts", 25),
                ("Livestock", 20),
                ("Other Activities", 10),
            ],
            Band::new(5, 60),
            DistributionRule::Drift(Drift::new(-0.03, 0.05)),
        ))
        .distribution(DistributionConfig::new(
            "savingsDistribution",
            &[
                ("Emergency Fund", 15_000),
                ("Investment Fund", 12_000),
                ("Loan Fund", 10_000),
                ("Development Fund", 8_000),
            ],
            Band::at_least(1_000),
            DistributionRule::Drift(Drift::new(-0.01, 0.02)),
        ))
        .distribution(DistributionConfig::new(
            "loanStatus",
            &[
                ("Active Loans", 3),
                ("Repaid Loans", 5),
                ("Pending Applications", 2),
            ],
            Band::unbounded(),
            DistributionRule::Static,
        ))
        .on(
            0.2,
            ActionSpec::Event(
                EventSpec::new("member_joined")
                    .subject(&["agriculture", "handicrafts", "livestock", "trading"])
                    .effect(Effect::counter("totalMembers", Delta::Fixed(1)))
                    .effect(Effect::counter("activeMembers", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "memberContribution",
                        CategoryPick::fixed("New Members"),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.4,
            ActionSpec::Event(
                EventSpec::new("collective_earning")
                    .amount(Draw::Uniform(IntRange::new(2_000, 8_000)))
                    .effect(Effect::counter("collectiveEarnings", Delta::Amount))
                    .effect(Effect::transfer(
                        "incomeSources",
                        CategoryPick::uniform(&income),
                        Delta::Fixed(1),
                    )),
            ),
        )
        .on(
            0.6,
            ActionSpec::Event(
                EventSpec::new("savings_contribution")
                    .amount(Draw::Uniform(IntRange::new(500, 3_000)))
                    .effect(Effect::counter("groupSavings", Delta::Amount))
                    .effect(Effect::transfer(
                        "savingsDistribution",
                        CategoryPick::uniform(&funds),
                        Delta::Amount,
                    )),
            ),
        )
        .on(
            0.75,
            ActionSpec::Event(
                EventSpec::new("loan_disbursed")
                    .amount(Draw::Uniform(IntRange::new(5_000, 50_000)))
                    .subject(&[
                        "agricultural_equipment",
                        "livestock_purchase",
                        "business_expansion",
                        "emergency",
                    ])
                    .effect(Effect::counter("loansDisbursed", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "loanStatus",
                        CategoryPick::fixed("Active Loans"),
                        Delta::Fixed(1),
                    ))
                    .effect(Effect::transfer(
                        "savingsDistribution",
                        CategoryPick::fixed("Loan Fund"),
                        Delta::NegAmount,
                    )),
            ),
        )
        .on(
            0.85,
            ActionSpec::Event(
                EventSpec::new("loan_repaid")
                    .requires(Precondition::Exceeds {
                        counter: "loansDisbursed".into(),
                        other: "loansRepaid".into(),
                    })
                    .amount(Draw::Uniform(IntRange::new(5_000, 25_000)))
                    .effect(Effect::counter("loansRepaid", Delta::Fixed(1)))
                    .effect(Effect::transfer(
                        "loanStatus",
                        CategoryPick::fixed("Repaid Loans"),
                        Delta::Fixed(1),
                    ))
                    .effect(Effect::transfer(
                        "loanStatus",
                        CategoryPick::fixed("Active Loans"),
                        Delta::Fixed(-1),
                    ))
                    .effect(Effect::transfer(
                        "savingsDistribution",
                        CategoryPick::fixed("Loan Fund"),
                        Delta::Amount,
                    )),
            ),
        )
        .on(
            0.95,
            ActionSpec::Event(
                EventSpec::new("member_became_contributor")
                    .chance(0.2)
                    .effect(Effect::transfer(
                        "memberContribution",
                        CategoryPick::fixed("Active Contributors"),
                        Delta::Fixed(1),
                    ))
                    .effect(Effect::transfer(
                        "memberContribution",
                        CategoryPick::fixed("Regular Members"),
                        Delta::Fixed(-1),
                    )),
            ),
        )
        .on(1.0, ActionSpec::Publish)
}

impl AlertConfig {
    fn system_alerts() -> Self {
        Self {
            key: "systemAlerts".to_string(),
            cap: 10,
            seeds: vec![
                AlertSeed::new(
                    AlertKind::Error,
                    "Payment Gateway Issue",
                    "Some transactions are failing due to gateway timeout",
                ),
                AlertSeed::new(
                    AlertKind::Warning,
                    "High Server Load",
                    "API response times are above normal thresholds",
                ),
            ],
            vocabulary: AlertVocabulary {
                kinds: vec![AlertKind::Error, AlertKind::Warning, AlertKind::Info],
                titles: [
                    "Database Connection Slow",
                    "High Memory Usage",
                    "Payment Gateway Timeout",
                    "New Hub Registration",
                    "SMS Service Degraded",
                    "API Rate Limit Exceeded",
                ]
                .map(String::from)
                .to_vec(),
                descriptions: [
                    "Database queries are taking longer than usual",
                    "Server memory usage is above 80%",
                    "Payment gateway is experiencing timeouts",
                    "New aggregation hub has been registered",
                    "SMS delivery service is experiencing delays",
                    "API rate limits have been exceeded",
                ]
                .map(String::from)
                .to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, TickOutcome};
    use chrono::{Local, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_role_builds_an_engine() {
        for kind in RoleKind::ALL {
            let engine = Engine::new(kind.config()).unwrap();
            assert_eq!(engine.actor_id(), kind.default_actor_id());
            assert_eq!(engine.role(), kind.to_string());
        }
    }

    #[test]
    fn destinations_follow_scope() {
        let paths: Vec<String> = RoleKind::ALL
            .iter()
            .map(|k| Engine::new(k.config()).unwrap().destination().path())
            .collect();
        assert_eq!(
            paths,
            vec![
                "analytics/users/buyer_001",
                "analytics/users/farmer_001",
                "analytics/dashboard",
                "analytics/hubs/hub_001",
                "analytics/shg/shg_001",
            ]
        );
    }

    #[test]
    fn loan_repayment_applies_every_transfer() {
        let mut engine = Engine::new(group()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let now = Local.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let fund_before = engine
            .state()
            .distribution("savingsDistribution")
            .and_then(|d| d.get("Loan Fund"))
            .unwrap();

        let outcome = engine.trigger("loan_repaid", &mut rng, now).unwrap();
        let TickOutcome::Event(report) = outcome else {
            panic!("expected an event, got {outcome:?}");
        };
        let amount = report.amount.unwrap() as u64;
        assert!((5_000..=25_000).contains(&amount));
        assert_eq!(report.transfers.len(), 3);

        let state = engine.state();
        assert_eq!(state.counter("loansRepaid"), Some(6));
        let loans = state.distribution("loanStatus").unwrap();
        assert_eq!(loans.get("Repaid Loans"), Some(6));
        assert_eq!(loans.get("Active Loans"), Some(2));
        let fund = state
            .distribution("savingsDistribution")
            .and_then(|d| d.get("Loan Fund"));
        assert_eq!(fund, Some(fund_before + amount));
    }

    #[test]
    fn purchase_lands_in_classified_category() {
        let mut engine = Engine::new(buyer()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let now = Local.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        let TickOutcome::Event(report) = engine.trigger("new_purchase", &mut rng, now).unwrap() else {
            panic!("purchase has no preconditions");
        };
        let transfer = &report.transfers[0];
        let expected = produce_categories()
            .classify(report.subject.as_deref().unwrap())
            .to_string();
        assert_eq!(transfer.category, expected);
        assert_eq!(
            engine.state().counter("totalSpent"),
            Some(285_000 + report.amount.unwrap() as u64)
        );
    }

    #[test]
    fn farmer_bid_leaves_state_untouched() {
        let mut engine = Engine::new(farmer()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let now = Local.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let before = engine.state().clone();

        for _ in 0..20 {
            engine.trigger("bid_received", &mut rng, now).unwrap();
        }
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn arriving_hub_order_names_product_and_farmer() {
        let mut engine = Engine::new(hub()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let now = Local.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        let before = engine.state().counter("totalOrdersProcessed");

        let TickOutcome::Event(report) = engine.trigger("order_arrived", &mut rng, now).unwrap() else {
            panic!("order arrival has no preconditions");
        };
        assert!(VILLAGES.contains(&report.subject.as_deref().unwrap()));
        let keys: Vec<&str> = report.details.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["product", "farmer"]);
        assert!(PRODUCTS.contains(&report.details[0].1.as_str()));
        assert!(FARMERS.contains(&report.details[1].1.as_str()));
        assert_eq!(
            engine.state().counter("totalOrdersProcessed"),
            before.map(|n| n + 1)
        );
    }
}
