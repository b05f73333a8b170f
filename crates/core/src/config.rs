//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the engine. Binaries call [`ConfigOverrides::from_env`] and then
//! [`CoreConfig::resolve`]; nothing in the core reads the process environment while serving
//! requests.

use crate::constants::{
    DEFAULT_CRITICAL_STOCK_THRESHOLD, DEFAULT_DONATION_INTERVAL_MONTHS, DEFAULT_HOME_FACILITY,
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_PRIVACY_KEY, DEFAULT_SHELF_LIFE_DAYS,
    MAX_SHELF_LIFE_DAYS,
};
use crate::hospital::StockThresholds;
use crate::{ColdChainError, ColdChainResult};
use std::str::FromStr;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    privacy_key: String,
    home_facility: String,
    stock_thresholds: StockThresholds,
    shelf_life_days: i64,
    donation_interval_months: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if the privacy key or home facility is blank, the
    /// shelf life is outside `1..=MAX_SHELF_LIFE_DAYS`, the donation interval is zero, or the
    /// critical threshold is not below the low threshold.
    pub fn new(
        privacy_key: String,
        home_facility: String,
        stock_thresholds: StockThresholds,
        shelf_life_days: i64,
        donation_interval_months: u32,
    ) -> ColdChainResult<Self> {
        if privacy_key.trim().is_empty() {
            return Err(ColdChainError::InvalidInput(
                "privacy_key cannot be empty".into(),
            ));
        }
        if home_facility.trim().is_empty() {
            return Err(ColdChainError::InvalidInput(
                "home_facility cannot be empty".into(),
            ));
        }
        if !(1..=MAX_SHELF_LIFE_DAYS).contains(&shelf_life_days) {
            return Err(ColdChainError::InvalidInput(format!(
                "shelf_life_days must be between 1 and {MAX_SHELF_LIFE_DAYS}"
            )));
        }
        if donation_interval_months == 0 {
            return Err(ColdChainError::InvalidInput(
                "donation_interval_months must be at least 1".into(),
            ));
        }
        stock_thresholds.validate()?;

        Ok(Self {
            privacy_key,
            home_facility: home_facility.trim().to_string(),
            stock_thresholds,
            shelf_life_days,
            donation_interval_months,
        })
    }

    /// Resolve configuration from optional raw values, falling back to the defaults in
    /// [`crate::constants`] for anything missing or blank.
    pub fn resolve(overrides: ConfigOverrides) -> ColdChainResult<Self> {
        let stock_thresholds = StockThresholds {
            low: numeric_from_env_value(
                "HEMOLINK_LOW_STOCK_THRESHOLD",
                overrides.low_stock_threshold,
                DEFAULT_LOW_STOCK_THRESHOLD,
            )?,
            critical: numeric_from_env_value(
                "HEMOLINK_CRITICAL_STOCK_THRESHOLD",
                overrides.critical_stock_threshold,
                DEFAULT_CRITICAL_STOCK_THRESHOLD,
            )?,
        };

        Self::new(
            non_blank(overrides.privacy_key).unwrap_or_else(|| DEFAULT_PRIVACY_KEY.into()),
            non_blank(overrides.home_facility).unwrap_or_else(|| DEFAULT_HOME_FACILITY.into()),
            stock_thresholds,
            numeric_from_env_value(
                "HEMOLINK_SHELF_LIFE_DAYS",
                overrides.shelf_life_days,
                DEFAULT_SHELF_LIFE_DAYS,
            )?,
            numeric_from_env_value(
                "HEMOLINK_DONATION_INTERVAL_MONTHS",
                overrides.donation_interval_months,
                DEFAULT_DONATION_INTERVAL_MONTHS,
            )?,
        )
    }

    pub fn privacy_key(&self) -> &str {
        &self.privacy_key
    }

    pub fn home_facility(&self) -> &str {
        &self.home_facility
    }

    pub fn stock_thresholds(&self) -> StockThresholds {
        self.stock_thresholds
    }

    pub fn shelf_life_days(&self) -> i64 {
        self.shelf_life_days
    }

    pub fn donation_interval_months(&self) -> u32 {
        self.donation_interval_months
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            privacy_key: DEFAULT_PRIVACY_KEY.into(),
            home_facility: DEFAULT_HOME_FACILITY.into(),
            stock_thresholds: StockThresholds {
                low: DEFAULT_LOW_STOCK_THRESHOLD,
                critical: DEFAULT_CRITICAL_STOCK_THRESHOLD,
            },
            shelf_life_days: DEFAULT_SHELF_LIFE_DAYS,
            donation_interval_months: DEFAULT_DONATION_INTERVAL_MONTHS,
        }
    }
}

/// Raw, unvalidated configuration values, typically straight from environment variables.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub privacy_key: Option<String>,
    pub home_facility: Option<String>,
    pub low_stock_threshold: Option<String>,
    pub critical_stock_threshold: Option<String>,
    pub shelf_life_days: Option<String>,
    pub donation_interval_months: Option<String>,
}

impl ConfigOverrides {
    /// Reads the `HEMOLINK_*` variables. Call once at startup.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            privacy_key: var("HEMOLINK_PRIVACY_KEY"),
            home_facility: var("HEMOLINK_HOME_FACILITY"),
            low_stock_threshold: var("HEMOLINK_LOW_STOCK_THRESHOLD"),
            critical_stock_threshold: var("HEMOLINK_CRITICAL_STOCK_THRESHOLD"),
            shelf_life_days: var("HEMOLINK_SHELF_LIFE_DAYS"),
            donation_interval_months: var("HEMOLINK_DONATION_INTERVAL_MONTHS"),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a numeric setting from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn numeric_from_env_value<T: FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> ColdChainResult<T> {
    match non_blank(value) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ColdChainError::InvalidInput(format!("{} is not a valid number: '{}'", name, raw))
        }),
    }
}
