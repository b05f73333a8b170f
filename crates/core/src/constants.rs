//! Constants used throughout the HemoLink core crate.
//!
//! Cold-chain thresholds are fixed domain policy; the `DEFAULT_*` values are the fallbacks used
//! when the corresponding setting is not configured.

/// Units with this many days (or fewer) left are classified as critical.
pub const EXPIRY_CRITICAL_MAX_DAYS: i64 = 1;

/// Units with this many days (or fewer) left, but above the critical bound, are expiring.
pub const EXPIRY_WARNING_MAX_DAYS: i64 = 5;

/// Readings strictly above this value are a cold-chain breach.
pub const BREACH_THRESHOLD_CELSIUS: f64 = 8.0;

/// Readings strictly above this value (and not a breach) raise a warning.
pub const WARNING_THRESHOLD_CELSIUS: f64 = 6.0;

/// Lowest reading accepted from a storage sensor.
pub const MIN_PLAUSIBLE_READING_CELSIUS: f64 = -50.0;

/// Highest reading accepted from a storage sensor.
pub const MAX_PLAUSIBLE_READING_CELSIUS: f64 = 60.0;

/// Temperature assigned to freshly collected units.
pub const STORAGE_TEMPERATURE_CELSIUS: f64 = 4.0;

/// Shared secret that unlocks detailed hospital stock.
pub const DEFAULT_PRIVACY_KEY: &str = "HEMO2024";

/// Facility that receives transfers when no destination is given.
pub const DEFAULT_HOME_FACILITY: &str = "CBB";

/// Total stock at or below which a hospital is reported as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 40;

/// Total stock at or below which a hospital is reported as critical.
pub const DEFAULT_CRITICAL_STOCK_THRESHOLD: u32 = 25;

/// Whole blood shelf life.
pub const DEFAULT_SHELF_LIFE_DAYS: i64 = 42;

/// Longest configurable shelf life.
pub const MAX_SHELF_LIFE_DAYS: i64 = 42;

/// Minimum gap between two donations by the same donor.
pub const DEFAULT_DONATION_INTERVAL_MONTHS: u32 = 3;

/// Lifetime of a login session.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Buffered events per subscriber before slow subscribers start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Prefix for generated blood unit identifiers.
pub const UNIT_ID_PREFIX: &str = "BB";
