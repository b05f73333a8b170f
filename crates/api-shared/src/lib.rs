//! # API Shared
//!
//! Shared utilities and definitions for the HemoLink APIs.
//!
//! Contains:
//! - JSON wire types (`wire` module), documented for OpenAPI
//! - Shared services like `HealthService`
//! - Bearer-token helpers
//!
//! Wire types carry plain strings and numbers only; conversion from the core's domain types
//! happens in the API crates.

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
