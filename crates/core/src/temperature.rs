//! Cold-chain temperature monitoring.
//!
//! A reading above [`BREACH_THRESHOLD_CELSIUS`] locks the unit permanently. There is no
//! operation that clears the lock; a breached unit also rejects any further reading, so the
//! first breach is the only one ever reported for a unit.

use crate::constants::{
    BREACH_THRESHOLD_CELSIUS, MAX_PLAUSIBLE_READING_CELSIUS, MIN_PLAUSIBLE_READING_CELSIUS,
    WARNING_THRESHOLD_CELSIUS,
};
use crate::unit::BloodUnit;
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Safety band of a single temperature reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureBand {
    /// 6°C or colder.
    Normal,
    /// Above 6°C, up to and including 8°C.
    Warning,
    /// Above 8°C.
    Breach,
}

impl TemperatureBand {
    pub fn as_str(self) -> &'static str {
        match self {
            TemperatureBand::Normal => "NORMAL",
            TemperatureBand::Warning => "WARNING",
            TemperatureBand::Breach => "BREACH",
        }
    }
}

impl fmt::Display for TemperatureBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a finite reading in °C.
pub fn band(reading: f64) -> TemperatureBand {
    if reading > BREACH_THRESHOLD_CELSIUS {
        TemperatureBand::Breach
    } else if reading > WARNING_THRESHOLD_CELSIUS {
        TemperatureBand::Warning
    } else {
        TemperatureBand::Normal
    }
}

/// Result of applying a reading to a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureUpdate {
    pub unit: BloodUnit,
    pub band: TemperatureBand,
    /// `true` only for the reading that applied the breach lock.
    pub breached: bool,
}

/// Applies `reading` to a copy of `unit`.
///
/// The returned unit always carries the new reading. A breach reading also sets the sticky
/// breach status. The input unit is left untouched so callers can commit or discard the result
/// as one step.
///
/// # Errors
///
/// Returns `ColdChainError::InvalidReading` if:
/// - the reading is NaN or infinite,
/// - the reading is outside the plausible sensor range,
/// - the unit is already locked by an earlier breach.
pub fn record_temperature(
    unit: &BloodUnit,
    reading: f64,
    now: DateTime<Utc>,
) -> ColdChainResult<TemperatureUpdate> {
    if !reading.is_finite() {
        return Err(ColdChainError::InvalidReading(format!(
            "reading for unit {} is not a finite number",
            unit.id()
        )));
    }
    if !(MIN_PLAUSIBLE_READING_CELSIUS..=MAX_PLAUSIBLE_READING_CELSIUS).contains(&reading) {
        return Err(ColdChainError::InvalidReading(format!(
            "{reading}°C is outside the sensor range {MIN_PLAUSIBLE_READING_CELSIUS}..={MAX_PLAUSIBLE_READING_CELSIUS}°C"
        )));
    }
    if unit.is_locked() {
        return Err(ColdChainError::InvalidReading(format!(
            "unit {} is locked after a cold-chain breach",
            unit.id()
        )));
    }

    let band = band(reading);
    let mut updated = unit.clone();
    updated.set_temperature(reading);

    let breached = band == TemperatureBand::Breach;
    if breached {
        updated.lock(now);
    }

    Ok(TemperatureUpdate {
        unit: updated,
        band,
        breached,
    })
}
