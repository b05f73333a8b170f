//! # HemoLink Core
//!
//! Core business logic for the HemoLink blood logistics network.
//!
//! This crate contains the cold-chain and inventory policy engine:
//! - Expiry classification and temperature monitoring of individual blood units
//! - The unit inventory, with FIFO-by-expiry ordering and the permanent breach lock
//! - Hospital stock aggregates and inter-hospital transfers
//! - Login sessions, role permissions and the privacy gate over stock detail
//! - Donor registration and the donation interval
//!
//! **No API concerns**: HTTP servers, JSON wire types and process configuration belong in
//! `api-rest`, `api-shared` and the binaries. Everything here is in memory and synchronous,
//! apart from the event channel.

pub mod access;
pub mod blood_type;
pub mod config;
pub mod constants;
pub mod donors;
pub mod engine;
pub mod error;
pub mod events;
pub mod expiry;
pub mod hospital;
pub mod inventory;
pub mod privacy;
pub mod seed;
pub mod session;
pub mod stats;
pub mod temperature;
pub mod transfer;
pub mod unit;

pub use access::{Capabilities, Permission, Role};
pub use blood_type::BloodType;
pub use config::{ConfigOverrides, CoreConfig};
pub use engine::{ColdChainEngine, HospitalSummary};
pub use error::{ColdChainError, ColdChainResult};
pub use events::{EventBus, InventoryEvent};
pub use expiry::ExpiryClass;
pub use hemolink_types::{EmailAddress, NonEmptyText, TextError};
pub use hospital::{Hospital, StockLevel, StockThresholds};
pub use seed::{load_seed_file, EngineSeed, SeedFile};
pub use session::{Session, UserProfile};
pub use stats::DashboardStats;
pub use temperature::{TemperatureBand, TemperatureUpdate};
pub use transfer::{TransferRecord, TransferRequest, TransferStatus, Urgency};
pub use unit::{BloodUnit, UnitSnapshot, UnitStatus};
