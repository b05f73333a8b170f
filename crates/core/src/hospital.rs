//! Hospital stock aggregates.
//!
//! Each [`Hospital`] keeps a per-blood-type unit count and a running total. The total is stored
//! alongside the counts and re-checked after every mutation; a mismatch is reported as
//! `ColdChainError::StockInvariant` and the mutation is not kept.

use crate::blood_type::BloodType;
use crate::{ColdChainError, ColdChainResult};
use hemolink_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type Stock = BTreeMap<BloodType, u32>;

/// Stock health of a hospital. Ordered from worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Critical,
    Low,
    Stable,
}

impl StockLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            StockLevel::Critical => "critical",
            StockLevel::Low => "low",
            StockLevel::Stable => "stable",
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total-unit bounds used to derive a [`StockLevel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockThresholds {
    /// At or below this total the hospital is low.
    pub low: u32,
    /// At or below this total the hospital is critical.
    pub critical: u32,
}

impl StockThresholds {
    pub fn validate(&self) -> ColdChainResult<()> {
        if self.critical >= self.low {
            return Err(ColdChainError::InvalidInput(format!(
                "critical stock threshold ({}) must be below the low threshold ({})",
                self.critical, self.low
            )));
        }
        Ok(())
    }

    pub fn level_for(&self, total_units: u32) -> StockLevel {
        if total_units <= self.critical {
            StockLevel::Critical
        } else if total_units <= self.low {
            StockLevel::Low
        } else {
            StockLevel::Stable
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hospital {
    id: String,
    name: NonEmptyText,
    latitude: f64,
    longitude: f64,
    stock: Stock,
    total_units: u32,
}

impl Hospital {
    /// Creates a hospital. Blood types missing from `stock` are recorded as zero.
    pub fn new(
        id: impl Into<String>,
        name: NonEmptyText,
        latitude: f64,
        longitude: f64,
        stock: Stock,
    ) -> ColdChainResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ColdChainError::InvalidInput(
                "hospital id cannot be empty".into(),
            ));
        }

        let mut full_stock: Stock = BloodType::ALL.iter().map(|bt| (*bt, 0)).collect();
        full_stock.extend(stock);

        let total_units = full_stock
            .values()
            .try_fold(0u32, |acc, n| acc.checked_add(*n))
            .ok_or_else(|| ColdChainError::InvalidInput(format!("stock overflow at {}", id)))?;

        Ok(Self {
            id,
            name,
            latitude,
            longitude,
            stock: full_stock,
            total_units,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &NonEmptyText {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn stock(&self) -> &Stock {
        &self.stock
    }

    pub fn stock_of(&self, blood_type: BloodType) -> u32 {
        self.stock.get(&blood_type).copied().unwrap_or(0)
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn status(&self, thresholds: StockThresholds) -> StockLevel {
        thresholds.level_for(self.total_units)
    }

    /// Checks that the stored total equals the sum of the per-type counts.
    pub fn verify_totals(&self) -> ColdChainResult<()> {
        let sum: u64 = self.stock.values().map(|n| u64::from(*n)).sum();
        if sum != u64::from(self.total_units) {
            return Err(ColdChainError::StockInvariant(self.id.clone()));
        }
        Ok(())
    }

    pub(crate) fn withdraw(&mut self, blood_type: BloodType, units: u32) -> ColdChainResult<()> {
        let on_hand = self.stock_of(blood_type);
        let remaining =
            on_hand
                .checked_sub(units)
                .ok_or_else(|| ColdChainError::InsufficientStock {
                    hospital_id: self.id.clone(),
                    blood_type,
                    requested: units,
                    eligible: on_hand,
                })?;
        self.stock.insert(blood_type, remaining);
        self.total_units = self.total_units.saturating_sub(units);
        self.verify_totals()
    }

    pub(crate) fn deposit(&mut self, blood_type: BloodType, units: u32) -> ColdChainResult<()> {
        let overflow = || ColdChainError::InvalidInput(format!("stock overflow at {}", self.id));
        let updated = self
            .stock_of(blood_type)
            .checked_add(units)
            .ok_or_else(overflow)?;
        let total = self.total_units.checked_add(units).ok_or_else(overflow)?;
        self.stock.insert(blood_type, updated);
        self.total_units = total;
        self.verify_totals()
    }
}

/// All hospitals (and the central blood bank) known to the engine.
#[derive(Debug)]
pub struct HospitalNetwork {
    hospitals: RwLock<BTreeMap<String, Hospital>>,
    thresholds: StockThresholds,
}

impl HospitalNetwork {
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` for duplicate ids or invalid thresholds.
    pub fn new(
        hospitals: impl IntoIterator<Item = Hospital>,
        thresholds: StockThresholds,
    ) -> ColdChainResult<Self> {
        thresholds.validate()?;
        let mut map = BTreeMap::new();
        for hospital in hospitals {
            let id = hospital.id().to_string();
            if map.insert(id.clone(), hospital).is_some() {
                return Err(ColdChainError::InvalidInput(format!(
                    "duplicate hospital id: {}",
                    id
                )));
            }
        }
        Ok(Self {
            hospitals: RwLock::new(map),
            thresholds,
        })
    }

    pub fn thresholds(&self) -> StockThresholds {
        self.thresholds
    }

    /// Every hospital, ordered by id.
    pub fn list(&self) -> ColdChainResult<Vec<Hospital>> {
        Ok(self.read()?.values().cloned().collect())
    }

    pub fn get(&self, id: &str) -> ColdChainResult<Hospital> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", id))
    }

    pub fn contains(&self, id: &str) -> ColdChainResult<bool> {
        Ok(self.read()?.contains_key(id))
    }

    pub(crate) fn read(&self) -> ColdChainResult<RwLockReadGuard<'_, BTreeMap<String, Hospital>>> {
        self.hospitals
            .read()
            .map_err(|_| ColdChainError::StatePoisoned)
    }

    pub(crate) fn write(
        &self,
    ) -> ColdChainResult<RwLockWriteGuard<'_, BTreeMap<String, Hospital>>> {
        self.hospitals
            .write()
            .map_err(|_| ColdChainError::StatePoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hospital(id: &str, stock: &[(BloodType, u32)]) -> Hospital {
        Hospital::new(
            id,
            NonEmptyText::new("Regional Medical Center").unwrap(),
            40.7484,
            -73.9857,
            stock.iter().copied().collect(),
        )
        .unwrap()
    }

    fn thresholds() -> StockThresholds {
        StockThresholds {
            low: 40,
            critical: 25,
        }
    }

    #[test]
    fn test_new_fills_missing_types_and_totals() {
        let h = hospital("H004", &[(BloodType::OPositive, 8), (BloodType::ONegative, 2)]);
        assert_eq!(h.stock().len(), 8);
        assert_eq!(h.stock_of(BloodType::AbNegative), 0);
        assert_eq!(h.total_units(), 10);
        h.verify_totals().expect("fresh hospital balances");
    }

    #[test]
    fn test_status_follows_thresholds() {
        assert_eq!(thresholds().level_for(21), StockLevel::Critical);
        assert_eq!(thresholds().level_for(25), StockLevel::Critical);
        assert_eq!(thresholds().level_for(36), StockLevel::Low);
        assert_eq!(thresholds().level_for(41), StockLevel::Stable);
    }

    #[test]
    fn test_withdraw_beyond_stock_fails_without_change() {
        let mut h = hospital("H004", &[(BloodType::ONegative, 2)]);
        let err = h
            .withdraw(BloodType::ONegative, 5)
            .expect_err("cannot withdraw more than held");
        assert!(matches!(
            err,
            ColdChainError::InsufficientStock {
                requested: 5,
                eligible: 2,
                ..
            }
        ));
        assert_eq!(h.stock_of(BloodType::ONegative), 2);
        assert_eq!(h.total_units(), 2);
    }

    #[test]
    fn test_withdraw_and_deposit_keep_totals_balanced() {
        let mut h = hospital("H001", &[(BloodType::APositive, 15)]);
        h.withdraw(BloodType::APositive, 4).unwrap();
        h.deposit(BloodType::ONegative, 3).unwrap();
        assert_eq!(h.total_units(), 14);
        h.verify_totals().unwrap();
    }

    #[test]
    fn test_network_rejects_duplicate_ids() {
        let err = HospitalNetwork::new([hospital("H001", &[]), hospital("H001", &[])], thresholds())
            .expect_err("duplicate ids should fail");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }
}
