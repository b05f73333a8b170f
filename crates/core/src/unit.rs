//! Blood unit records.

use crate::blood_type::BloodType;
use crate::expiry::{self, ExpiryClass};
use crate::temperature::{self, TemperatureBand};
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored cold-chain state of a unit, plus the derived `Critical` display state.
///
/// Only `Available` and `Breach` are ever stored. `Critical` is reported by
/// [`BloodUnit::display_status`] for unlocked units in the critical expiry class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Critical,
    Breach,
}

impl UnitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Critical => "critical",
            UnitStatus::Breach => "breach",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single bag of collected blood.
///
/// The identifier, blood type and dates are fixed at construction. The temperature and the
/// breach lock change only through [`crate::temperature::record_temperature`]; the location
/// changes only through transfers.
#[derive(Clone, Debug, PartialEq)]
pub struct BloodUnit {
    id: String,
    blood_type: BloodType,
    collection_date: NaiveDate,
    expiry_date: NaiveDate,
    temperature: f64,
    status: UnitStatus,
    breached_at: Option<DateTime<Utc>>,
    location: String,
}

impl BloodUnit {
    /// Creates a freshly collected, unlocked unit expiring `shelf_life_days` after collection.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if the expiry date is out of range, as well as the
    /// errors of [`BloodUnit::from_parts`].
    pub fn collected(
        id: impl Into<String>,
        blood_type: BloodType,
        collection_date: NaiveDate,
        shelf_life_days: i64,
        temperature: f64,
        location: impl Into<String>,
    ) -> ColdChainResult<Self> {
        Self::from_parts(
            id,
            blood_type,
            collection_date,
            expiry::offset_days(collection_date, shelf_life_days)?,
            temperature,
            false,
            location,
        )
    }

    /// Rebuilds a unit from stored values.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if the identifier or location is blank, the
    /// expiry date precedes the collection date, or the temperature is not finite.
    pub fn from_parts(
        id: impl Into<String>,
        blood_type: BloodType,
        collection_date: NaiveDate,
        expiry_date: NaiveDate,
        temperature: f64,
        breached: bool,
        location: impl Into<String>,
    ) -> ColdChainResult<Self> {
        let id = id.into().trim().to_string();
        let location = location.into().trim().to_string();

        if id.is_empty() {
            return Err(ColdChainError::InvalidInput("unit id cannot be empty".into()));
        }
        if location.is_empty() {
            return Err(ColdChainError::InvalidInput(format!(
                "unit {} has no location",
                id
            )));
        }
        if expiry_date < collection_date {
            return Err(ColdChainError::InvalidInput(format!(
                "unit {} expires before it was collected",
                id
            )));
        }
        if !temperature.is_finite() {
            return Err(ColdChainError::InvalidInput(format!(
                "unit {} has a non-finite temperature",
                id
            )));
        }

        Ok(Self {
            id,
            blood_type,
            collection_date,
            expiry_date,
            temperature,
            status: if breached {
                UnitStatus::Breach
            } else {
                UnitStatus::Available
            },
            breached_at: None,
            location,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn blood_type(&self) -> BloodType {
        self.blood_type
    }

    pub fn collection_date(&self) -> NaiveDate {
        self.collection_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Stored status: `Available` or `Breach`.
    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// When the breach lock was applied, if it was applied by a reading in this process.
    pub fn breached_at(&self) -> Option<DateTime<Utc>> {
        self.breached_at
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// A breached unit is locked out of every transfer-eligible operation.
    pub fn is_locked(&self) -> bool {
        self.status == UnitStatus::Breach
    }

    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        expiry::days_to_expiry(self.expiry_date, today)
    }

    pub fn expiry_class(&self, today: NaiveDate) -> ExpiryClass {
        expiry::classify(self.days_to_expiry(today))
    }

    pub fn temperature_band(&self) -> TemperatureBand {
        temperature::band(self.temperature)
    }

    /// Status as shown to callers: the breach lock wins, then critical expiry.
    pub fn display_status(&self, today: NaiveDate) -> UnitStatus {
        if self.is_locked() {
            UnitStatus::Breach
        } else if self.expiry_class(today) == ExpiryClass::Critical {
            UnitStatus::Critical
        } else {
            UnitStatus::Available
        }
    }

    pub(crate) fn set_temperature(&mut self, reading: f64) {
        self.temperature = reading;
    }

    pub(crate) fn lock(&mut self, at: DateTime<Utc>) {
        self.status = UnitStatus::Breach;
        self.breached_at = Some(at);
    }

    pub(crate) fn relocate(&mut self, destination: &str) {
        self.location = destination.to_string();
    }
}

/// A unit together with the display state derived for a given day.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSnapshot {
    pub unit: BloodUnit,
    pub days_to_expiry: i64,
    pub expiry_class: ExpiryClass,
    pub temperature_band: TemperatureBand,
    pub status: UnitStatus,
}

impl UnitSnapshot {
    pub fn of(unit: BloodUnit, today: NaiveDate) -> Self {
        let days_to_expiry = unit.days_to_expiry(today);
        Self {
            expiry_class: expiry::classify(days_to_expiry),
            temperature_band: unit.temperature_band(),
            status: unit.display_status(today),
            days_to_expiry,
            unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_collected_unit_expires_after_shelf_life() {
        let unit = BloodUnit::collected(
            "BB100",
            BloodType::APositive,
            date(2024, 12, 1),
            42,
            4.0,
            "H001",
        )
        .expect("unit should be valid");
        assert_eq!(unit.expiry_date(), date(2025, 1, 12));
        assert_eq!(unit.status(), UnitStatus::Available);
    }

    #[test]
    fn test_collected_unit_with_unrepresentable_expiry_is_invalid() {
        let err = BloodUnit::collected(
            "BB101",
            BloodType::APositive,
            NaiveDate::MAX,
            42,
            4.0,
            "H001",
        )
        .expect_err("expiry past the calendar");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }

    #[test]
    fn test_from_parts_rejects_expiry_before_collection() {
        let err = BloodUnit::from_parts(
            "BB100",
            BloodType::APositive,
            date(2024, 12, 10),
            date(2024, 12, 1),
            4.0,
            false,
            "H001",
        )
        .expect_err("expiry before collection should fail");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }

    #[test]
    fn test_display_status_prefers_breach_over_expiry() {
        let unit = BloodUnit::from_parts(
            "BB101",
            BloodType::OPositive,
            date(2024, 12, 1),
            date(2024, 12, 18),
            12.5,
            true,
            "H002",
        )
        .unwrap();
        assert_eq!(unit.display_status(date(2024, 12, 17)), UnitStatus::Breach);
    }

    #[test]
    fn test_display_status_reports_critical_expiry() {
        let unit = BloodUnit::from_parts(
            "BB004",
            BloodType::AbPositive,
            date(2024, 11, 28),
            date(2024, 12, 18),
            3.5,
            false,
            "H001",
        )
        .unwrap();
        let snapshot = UnitSnapshot::of(unit, date(2024, 12, 17));
        assert_eq!(snapshot.days_to_expiry, 1);
        assert_eq!(snapshot.expiry_class, ExpiryClass::Critical);
        assert_eq!(snapshot.status, UnitStatus::Critical);
        assert!(!snapshot.unit.is_locked());
    }
}
