//! In-memory blood unit inventory.
//!
//! [`InventoryStore`] is the single owner of every [`BloodUnit`]. All mutations take the write
//! lock for the whole read-modify-write, so a temperature update and a transfer of the same unit
//! are serialised: whichever runs second observes the other's outcome. Mutations are computed on
//! a copy and only stored once they succeed, so a failed call never leaves a partially updated
//! unit behind.
//!
//! ## Ordering
//!
//! Listings are FIFO-by-expiry: ascending days to expiry, ties broken by ascending unit id.

use crate::blood_type::BloodType;
use crate::constants::UNIT_ID_PREFIX;
use crate::temperature::{self, TemperatureUpdate};
use crate::unit::{BloodUnit, UnitSnapshot};
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) type UnitMap = BTreeMap<String, BloodUnit>;

#[derive(Debug, Default)]
pub struct InventoryStore {
    units: RwLock<UnitMap>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from an initial set of units.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if two units share an identifier.
    pub fn with_units(units: impl IntoIterator<Item = BloodUnit>) -> ColdChainResult<Self> {
        let mut map = UnitMap::new();
        for unit in units {
            let id = unit.id().to_string();
            if map.insert(id.clone(), unit).is_some() {
                return Err(ColdChainError::InvalidInput(format!(
                    "duplicate unit id: {}",
                    id
                )));
            }
        }
        Ok(Self {
            units: RwLock::new(map),
        })
    }

    /// Adds a unit built from a freshly allocated identifier.
    ///
    /// The identifier is allocated and the unit inserted under one write lock, so concurrent
    /// admissions never collide.
    pub fn admit(
        &self,
        build: impl FnOnce(String) -> ColdChainResult<BloodUnit>,
    ) -> ColdChainResult<BloodUnit> {
        let mut units = self.write()?;
        let id = next_unit_id(&units);
        let unit = build(id.clone())?;
        if unit.id() != id {
            return Err(ColdChainError::InvalidInput(format!(
                "admitted unit must use allocated id {}",
                id
            )));
        }
        units.insert(id, unit.clone());
        tracing::info!(unit_id = unit.id(), location = unit.location(), "unit admitted");
        Ok(unit)
    }

    /// Units held, transferred or locked ones included.
    pub fn unit_count(&self) -> ColdChainResult<usize> {
        Ok(self.read()?.len())
    }

    /// Lists every unit, earliest-expiring first, with display state derived for `today`.
    pub fn list_by_expiry(&self, today: NaiveDate) -> ColdChainResult<Vec<UnitSnapshot>> {
        let units = self.read()?;
        let mut ordered: Vec<BloodUnit> = units.values().cloned().collect();
        sort_by_expiry(&mut ordered, today);
        Ok(ordered
            .into_iter()
            .map(|unit| UnitSnapshot::of(unit, today))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` if no unit has this identifier.
    pub fn get(&self, id: &str) -> ColdChainResult<BloodUnit> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("unit", id))
    }

    /// Records a temperature reading against a stored unit.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` for an unknown unit, or the
    /// `ColdChainError::InvalidReading` raised by [`temperature::record_temperature`]. The
    /// stored unit is unchanged on error.
    pub fn apply_temperature_update(
        &self,
        id: &str,
        reading: f64,
        now: DateTime<Utc>,
    ) -> ColdChainResult<TemperatureUpdate> {
        let mut units = self.write()?;
        let current = units
            .get(id)
            .ok_or_else(|| ColdChainError::not_found("unit", id))?;

        let update = temperature::record_temperature(current, reading, now)?;
        units.insert(id.to_string(), update.unit.clone());

        if update.breached {
            tracing::warn!(
                unit_id = id,
                temperature = reading,
                "cold-chain breach, unit locked"
            );
        } else {
            tracing::debug!(unit_id = id, temperature = reading, band = %update.band, "temperature recorded");
        }

        Ok(update)
    }

    /// Moves a unit to `destination`, leaving every other field unchanged.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ColdChainError::NotFound` if the unit does not exist,
    /// - `ColdChainError::Locked` if the unit is breached (its location is not touched).
    pub fn mark_transferred(&self, id: &str, destination: &str) -> ColdChainResult<BloodUnit> {
        let mut units = self.write()?;
        let unit = units
            .get_mut(id)
            .ok_or_else(|| ColdChainError::not_found("unit", id))?;

        if unit.is_locked() {
            return Err(ColdChainError::Locked(id.to_string()));
        }

        let from = unit.location().to_string();
        unit.relocate(destination);
        tracing::info!(unit_id = id, from = %from, to = destination, "unit transferred");

        Ok(unit.clone())
    }

    pub(crate) fn read(&self) -> ColdChainResult<RwLockReadGuard<'_, UnitMap>> {
        self.units.read().map_err(|_| ColdChainError::StatePoisoned)
    }

    pub(crate) fn write(&self) -> ColdChainResult<RwLockWriteGuard<'_, UnitMap>> {
        self.units.write().map_err(|_| ColdChainError::StatePoisoned)
    }
}

/// Sorts ascending by days to expiry, then by id.
pub(crate) fn sort_by_expiry(units: &mut [BloodUnit], today: NaiveDate) {
    units.sort_by(|a, b| {
        a.days_to_expiry(today)
            .cmp(&b.days_to_expiry(today))
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Unlocked units of `blood_type` at `location`, earliest-expiring first.
pub(crate) fn fifo_candidates(
    units: &UnitMap,
    location: &str,
    blood_type: BloodType,
    today: NaiveDate,
) -> Vec<String> {
    let mut matching: Vec<BloodUnit> = units
        .values()
        .filter(|u| u.location() == location && u.blood_type() == blood_type && !u.is_locked())
        .cloned()
        .collect();
    sort_by_expiry(&mut matching, today);
    matching.into_iter().map(|u| u.id().to_string()).collect()
}

/// Breached units of `blood_type` held at `location`.
pub(crate) fn locked_count(units: &UnitMap, location: &str, blood_type: BloodType) -> u32 {
    let count = units
        .values()
        .filter(|u| u.location() == location && u.blood_type() == blood_type && u.is_locked())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn next_unit_id(units: &UnitMap) -> String {
    let highest = units
        .keys()
        .filter_map(|id| id.strip_prefix(UNIT_ID_PREFIX))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", UNIT_ID_PREFIX, highest + 1)
}
