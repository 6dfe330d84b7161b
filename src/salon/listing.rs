//! Public visibility of a salon, derived from its staffing.

use serde::{Deserialize, Serialize};

/// Whether a salon shows up in public listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingStatus {
    Listed,
    #[default]
    NotListed,
}

impl ListingStatus {
    /// A salon is listed as soon as one of its barbers is active.
    pub fn from_active_barbers(count: u64) -> Self {
        if count > 0 {
            Self::Listed
        } else {
            Self::NotListed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::NotListed => "notListed",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_from_count() {
        assert_eq!(ListingStatus::from_active_barbers(0), ListingStatus::NotListed);
        assert_eq!(ListingStatus::from_active_barbers(1), ListingStatus::Listed);
        assert_eq!(ListingStatus::from_active_barbers(42), ListingStatus::Listed);
    }

    #[test]
    fn test_listing_is_idempotent() {
        for count in [0, 1, 7] {
            let first = ListingStatus::from_active_barbers(count);
            let second = ListingStatus::from_active_barbers(count);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_string(&ListingStatus::NotListed).unwrap(),
            r#""notListed""#
        );
        assert_eq!(ListingStatus::Listed.to_string(), "listed");
    }
}
