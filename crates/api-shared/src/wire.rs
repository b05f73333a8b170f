//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Dates are `YYYY-MM-DD`, times `HH:MM` and
//! timestamps RFC 3339.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// Auth

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub permissions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRes {
    pub user: UserRes,
    pub token: String,
    pub expires_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrivacyReq {
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrivacyRes {
    pub unlocked: bool,
}

// Inventory

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BloodUnitRes {
    pub id: String,
    pub blood_type: String,
    pub collection_date: String,
    pub expiry_date: String,
    pub days_to_expiry: i64,
    /// `CRITICAL`, `EXPIRING` or `GOOD`.
    pub expiry_class: String,
    pub temperature: f64,
    /// `NORMAL`, `WARNING` or `BREACH`.
    pub temperature_band: String,
    /// `available`, `critical` or `breach`.
    pub status: String,
    pub location: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransferUnitReq {
    /// Receiving facility. Defaults to the configured home facility.
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureReq {
    pub temperature: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureRes {
    pub unit: BloodUnitRes,
    pub band: String,
    /// `true` when this reading locked the unit.
    pub breached: bool,
}

// Hospitals and transfers

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalRes {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub total_units: u32,
    /// `critical`, `low` or `stable`.
    pub status: String,
    /// Per-type counts, present only after a privacy unlock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<BTreeMap<String, u32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferReq {
    /// Hospital the stock is requested from.
    pub hospital_id: String,
    pub blood_type: String,
    pub units: u32,
    /// `normal` (default), `urgent` or `critical`.
    #[serde(default)]
    pub urgency: Option<String>,
    /// Receiving facility. Defaults to the configured home facility.
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRes {
    pub id: String,
    pub source_id: String,
    pub destination_id: String,
    pub blood_type: String,
    pub units: u32,
    pub urgency: String,
    pub status: String,
    pub unit_ids: Vec<String>,
    pub requested_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsRes {
    pub total_units: u64,
    pub expiring_units: u64,
    pub critical_alerts: u64,
    pub active_transfers: u64,
    pub donors_today: u64,
    pub temperatures_normal: u8,
}

// Donors

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonorRegisterReq {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub blood_type: String,
    pub preferred_date: String,
    pub preferred_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRes {
    pub id: String,
    pub donor_id: String,
    pub name: String,
    pub blood_type: String,
    pub date: String,
    pub time: String,
    pub status: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonorCardRes {
    pub id: String,
    pub name: String,
    pub blood_type: String,
    pub phone: String,
    pub donations: u32,
    pub last_donation: Option<String>,
    /// Donations are allowed only after this date. Absent for first-time donors.
    pub next_eligible: Option<String>,
    pub appointment: AppointmentRes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DonationReq {
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    /// Collecting facility. Defaults to the configured home facility.
    #[serde(default)]
    pub facility: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationRes {
    pub donor_id: String,
    pub donations: u32,
    pub last_donation: String,
    pub unit: BloodUnitRes,
}
