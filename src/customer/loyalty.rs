//! Membership tier derived from a loyalty point balance.

use serde::{Deserialize, Serialize};

/// Points awarded when a completed booking is recorded.
pub const COMPLETED_BOOKING_POINTS: i64 = 10;

const PLATINUM_THRESHOLD: i64 = 5000;
const GOLD_THRESHOLD: i64 = 2000;
const SILVER_THRESHOLD: i64 = 500;

/// Loyalty bracket of a customer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl MembershipTier {
    /// Resolve the tier of a point balance, highest threshold first.
    ///
    /// Balances are not clamped: a negative balance is simply bronze.
    pub fn from_points(points: i64) -> Self {
        if points >= PLATINUM_THRESHOLD {
            Self::Platinum
        } else if points >= GOLD_THRESHOLD {
            Self::Gold
        } else if points >= SILVER_THRESHOLD {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    /// Lowercase name, as stored and as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MembershipTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            _ => Err(format!("unknown membership tier `{s}`")),
        }
    }
}

/// Direction of a loyalty point change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointsAction {
    Add,
    Deduct,
}

impl PointsAction {
    /// Signed delta to apply for `points`.
    pub fn delta(&self, points: i64) -> i64 {
        match self {
            Self::Add => points,
            Self::Deduct => -points,
        }
    }
}

/// Apply `delta` to `balance` and derive the resulting tier.
pub fn apply(balance: i64, delta: i64) -> (i64, MembershipTier) {
    let points = balance.saturating_add(delta);
    (points, MembershipTier::from_points(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(MembershipTier::from_points(0), MembershipTier::Bronze);
        assert_eq!(MembershipTier::from_points(499), MembershipTier::Bronze);
        assert_eq!(MembershipTier::from_points(500), MembershipTier::Silver);
        assert_eq!(MembershipTier::from_points(1999), MembershipTier::Silver);
        assert_eq!(MembershipTier::from_points(2000), MembershipTier::Gold);
        assert_eq!(MembershipTier::from_points(4999), MembershipTier::Gold);
        assert_eq!(MembershipTier::from_points(5000), MembershipTier::Platinum);
        assert_eq!(
            MembershipTier::from_points(i64::MAX),
            MembershipTier::Platinum
        );
    }

    #[test]
    fn test_tier_is_monotonic() {
        let mut previous = MembershipTier::from_points(-1_000);
        for points in -1_000..=6_000 {
            let tier = MembershipTier::from_points(points);
            assert!(tier >= previous, "tier went down at {points}");
            previous = tier;
        }
    }

    #[test]
    fn test_deduct_below_zero() {
        let (points, tier) = apply(30, PointsAction::Deduct.delta(100));
        assert_eq!(points, -70);
        assert_eq!(tier, MembershipTier::Bronze);
    }

    #[test]
    fn test_apply_crosses_threshold() {
        assert_eq!(apply(490, 10), (500, MembershipTier::Silver));
        assert_eq!(apply(2000, -1), (1999, MembershipTier::Silver));
    }

    #[test]
    fn test_parse() {
        assert_eq!("gold".parse::<MembershipTier>(), Ok(MembershipTier::Gold));
        assert!("diamond".parse::<MembershipTier>().is_err());
        assert_eq!(MembershipTier::Platinum.to_string(), "platinum");
    }
}
