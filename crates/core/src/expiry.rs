//! Expiry classification for blood units.
//!
//! Classification is a pure function of the number of whole days left before a unit's expiry
//! date. Already-expired units (negative days) fall into the critical class.

use crate::constants::{EXPIRY_CRITICAL_MAX_DAYS, EXPIRY_WARNING_MAX_DAYS};
use crate::{ColdChainError, ColdChainResult};
use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How close a unit is to its expiry date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryClass {
    /// One day or less left, or already expired.
    Critical,
    /// Between two and five days left.
    Expiring,
    /// More than five days left.
    Good,
}

impl ExpiryClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryClass::Critical => "CRITICAL",
            ExpiryClass::Expiring => "EXPIRING",
            ExpiryClass::Good => "GOOD",
        }
    }
}

impl fmt::Display for ExpiryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a unit by its remaining shelf life.
pub fn classify(days_to_expiry: i64) -> ExpiryClass {
    if days_to_expiry <= EXPIRY_CRITICAL_MAX_DAYS {
        ExpiryClass::Critical
    } else if days_to_expiry <= EXPIRY_WARNING_MAX_DAYS {
        ExpiryClass::Expiring
    } else {
        ExpiryClass::Good
    }
}

/// Whole days from `today` until `expiry_date`; negative once the date has passed.
pub fn days_to_expiry(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiry_date - today).num_days()
}

/// `date` moved by `days` (negative moves back).
///
/// # Errors
///
/// Returns `ColdChainError::InvalidInput` if the result falls outside the supported calendar.
pub fn offset_days(date: NaiveDate, days: i64) -> ColdChainResult<NaiveDate> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            ColdChainError::InvalidInput(format!("{date} moved by {days} days is out of range"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_one_day_is_critical() {
        assert_eq!(classify(1), ExpiryClass::Critical);
    }

    #[test]
    fn test_boundary_two_days_is_expiring() {
        assert_eq!(classify(2), ExpiryClass::Expiring);
    }

    #[test]
    fn test_boundary_five_days_is_expiring() {
        assert_eq!(classify(5), ExpiryClass::Expiring);
    }

    #[test]
    fn test_boundary_six_days_is_good() {
        assert_eq!(classify(6), ExpiryClass::Good);
    }

    #[test]
    fn test_expired_and_same_day_units_are_critical() {
        for days in [-30, -1, 0] {
            assert_eq!(classify(days), ExpiryClass::Critical, "days = {days}");
        }
    }

    #[test]
    fn test_long_dated_units_are_good() {
        assert_eq!(classify(42), ExpiryClass::Good);
    }

    #[test]
    fn test_days_to_expiry_counts_calendar_days() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 17).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        assert_eq!(days_to_expiry(expiry, today), 3);
        assert_eq!(days_to_expiry(today, expiry), -3);
    }

    #[test]
    fn test_offset_days_rejects_out_of_range_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 17).unwrap();
        assert_eq!(
            offset_days(today, -42).unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 5).unwrap()
        );
        assert!(matches!(
            offset_days(NaiveDate::MAX, 42),
            Err(ColdChainError::InvalidInput(_))
        ));
        assert!(matches!(
            offset_days(today, i64::MAX),
            Err(ColdChainError::InvalidInput(_))
        ));
    }
}
