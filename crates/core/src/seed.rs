//! Initial engine data.
//!
//! The engine starts either from the built-in demo network or from a YAML seed file. Seed files
//! use the same field names as the HTTP API:
//!
//! ```yaml
//! hospitals:
//!   - id: H001
//!     name: City General Hospital
//!     latitude: 40.7128
//!     longitude: -74.006
//!     stock: { "A+": 15, "O-": 10 }
//! units:
//!   - id: BB001
//!     bloodType: A+
//!     expiresInDays: 3
//!     temperature: 4.2
//!     location: H001
//! ```
//!
//! A unit gives either an absolute `expiryDate` or `expiresInDays` counted from the day the
//! seed is loaded. Without a `collectionDate` the unit is taken to have been collected one shelf
//! life before it expires.

use crate::access::Role;
use crate::blood_type::BloodType;
use crate::constants::{DEFAULT_HOME_FACILITY, STORAGE_TEMPERATURE_CELSIUS};
use crate::donors::{Appointment, AppointmentStatus, Donor};
use crate::expiry::offset_days;
use crate::hospital::{Hospital, Stock};
use crate::session::UserAccount;
use crate::unit::BloodUnit;
use crate::{ColdChainError, ColdChainResult};
use chrono::{NaiveDate, NaiveTime};
use hemolink_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to build an engine.
#[derive(Clone, Debug)]
pub struct EngineSeed {
    pub hospitals: Vec<Hospital>,
    pub units: Vec<BloodUnit>,
    pub donors: Vec<Donor>,
    pub appointments: Vec<Appointment>,
    pub users: Vec<UserAccount>,
}

impl EngineSeed {
    /// The demo network: four hospitals and the central blood bank, eight tracked units and
    /// three booked donors. Unit expiry and appointment dates are relative to `today`.
    pub fn demo(today: NaiveDate, shelf_life_days: i64) -> ColdChainResult<Self> {
        Ok(Self {
            hospitals: demo_hospitals()?,
            units: demo_units(today, shelf_life_days)?,
            donors: demo_donors()?,
            appointments: demo_appointments(today)?,
            users: demo_users()?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFile {
    #[serde(default)]
    pub hospitals: Vec<HospitalSeed>,
    #[serde(default)]
    pub units: Vec<UnitSeed>,
    #[serde(default)]
    pub donors: Vec<Donor>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalSeed {
    pub id: String,
    pub name: NonEmptyText,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub stock: Stock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSeed {
    pub id: String,
    pub blood_type: BloodType,
    pub collection_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub expires_in_days: Option<i64>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub breached: bool,
    pub location: String,
}

fn default_temperature() -> f64 {
    STORAGE_TEMPERATURE_CELSIUS
}

impl SeedFile {
    pub fn parse(yaml: &str) -> ColdChainResult<Self> {
        serde_yaml::from_str(yaml).map_err(ColdChainError::YamlDeserialization)
    }

    /// Builds engine data from the file. Login accounts are always the demo accounts.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` for a unit with neither (or both of) `expiryDate`
    /// and `expiresInDays`, or any record that fails validation.
    pub fn into_seed(self, today: NaiveDate, shelf_life_days: i64) -> ColdChainResult<EngineSeed> {
        let hospitals = self
            .hospitals
            .into_iter()
            .map(|h| Hospital::new(h.id, h.name, h.latitude, h.longitude, h.stock))
            .collect::<ColdChainResult<Vec<_>>>()?;

        let units = self
            .units
            .into_iter()
            .map(|u| {
                let expiry = match (u.expiry_date, u.expires_in_days) {
                    (Some(date), None) => date,
                    (None, Some(days)) => offset_days(today, days)?,
                    _ => {
                        return Err(ColdChainError::InvalidInput(format!(
                            "unit {} needs exactly one of expiryDate or expiresInDays",
                            u.id
                        )));
                    }
                };
                let collection = match u.collection_date {
                    Some(date) => date,
                    None => offset_days(expiry, shelf_life_days.saturating_neg())?,
                };
                BloodUnit::from_parts(
                    u.id,
                    u.blood_type,
                    collection,
                    expiry,
                    u.temperature,
                    u.breached,
                    u.location,
                )
            })
            .collect::<ColdChainResult<Vec<_>>>()?;

        Ok(EngineSeed {
            hospitals,
            units,
            donors: self.donors,
            appointments: self.appointments,
            users: demo_users()?,
        })
    }
}

/// Reads and parses a YAML seed file.
pub fn load_seed_file(path: &Path) -> ColdChainResult<SeedFile> {
    let yaml = fs::read_to_string(path).map_err(ColdChainError::FileRead)?;
    SeedFile::parse(&yaml)
}

fn text(value: &str) -> ColdChainResult<NonEmptyText> {
    Ok(NonEmptyText::new(value)?)
}

fn demo_hospitals() -> ColdChainResult<Vec<Hospital>> {
    use BloodType::*;

    let rows: [(&str, &str, f64, f64, [u32; 8]); 5] = [
        ("H001", "City General Hospital", 40.7128, -74.006, [15, 8, 12, 5, 4, 2, 20, 10]),
        ("H002", "Metro Hospital", 40.7282, -73.9942, [8, 3, 6, 2, 1, 0, 12, 4]),
        ("H003", "St. Mary Medical", 40.6892, -74.0445, [20, 12, 15, 8, 6, 4, 25, 15]),
        ("H004", "Regional Medical Center", 40.7484, -73.9857, [5, 2, 3, 1, 0, 0, 8, 2]),
        (DEFAULT_HOME_FACILITY, "Central Blood Bank", 40.7306, -73.9866, [0; 8]),
    ];
    let order = [
        APositive, ANegative, BPositive, BNegative, AbPositive, AbNegative, OPositive, ONegative,
    ];

    rows.into_iter()
        .map(|(id, name, lat, lng, counts)| {
            let stock: Stock = order.into_iter().zip(counts).collect();
            Hospital::new(id, text(name)?, lat, lng, stock)
        })
        .collect()
}

fn demo_units(today: NaiveDate, shelf_life_days: i64) -> ColdChainResult<Vec<BloodUnit>> {
    use BloodType::*;

    let rows = [
        ("BB001", APositive, 3, 4.2, false, "H001"),
        ("BB002", ONegative, 5, 3.8, false, "H001"),
        ("BB003", BPositive, 11, 4.0, false, "H002"),
        ("BB004", AbPositive, 1, 3.5, false, "H001"),
        ("BB005", ANegative, 9, 4.1, false, "H003"),
        ("BB006", OPositive, 15, 12.5, true, "H002"),
        ("BB007", BNegative, 4, 3.9, false, "H004"),
        ("BB008", AbNegative, 12, 4.3, false, "H001"),
    ];

    rows.into_iter()
        .map(|(id, blood_type, days, temperature, breached, location)| {
            let expiry = offset_days(today, days)?;
            BloodUnit::from_parts(
                id,
                blood_type,
                offset_days(expiry, shelf_life_days.saturating_neg())?,
                expiry,
                temperature,
                breached,
                location,
            )
        })
        .collect()
}

fn demo_donors() -> ColdChainResult<Vec<Donor>> {
    [
        ("D001", "John Smith", BloodType::APositive, "555-0101"),
        ("D002", "Emma Davis", BloodType::ONegative, "555-0102"),
        ("D003", "James Wilson", BloodType::BPositive, "555-0103"),
    ]
    .into_iter()
    .map(|(id, name, blood_type, phone)| {
        Ok(Donor {
            id: id.into(),
            name: text(name)?,
            phone: phone.into(),
            email: None,
            blood_type,
            last_donation: None,
            donations: 0,
        })
    })
    .collect()
}

fn demo_appointments(today: NaiveDate) -> ColdChainResult<Vec<Appointment>> {
    [
        ("AP001", "D001", 3, (9, 0)),
        ("AP002", "D002", 3, (10, 30)),
        ("AP003", "D003", 4, (14, 0)),
    ]
    .into_iter()
    .map(|(id, donor_id, days, (hour, minute))| {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ColdChainError::InvalidInput(format!("invalid appointment time {hour}:{minute}"))
        })?;
        Ok(Appointment {
            id: id.into(),
            donor_id: donor_id.into(),
            date: offset_days(today, days)?,
            time,
            status: AppointmentStatus::Scheduled,
        })
    })
    .collect()
}

fn demo_users() -> ColdChainResult<Vec<UserAccount>> {
    [
        ("U001", "receptionist@hemolink.com", "Sarah Johnson", Role::Receptionist),
        ("U002", "labtech@hemolink.com", "Michael Chen", Role::LabTech),
        ("U003", "doctor@hemolink.com", "Dr. Emily Williams", Role::Doctor),
        ("U004", "admin@hemolink.com", "Admin User", Role::Admin),
    ]
    .into_iter()
    .map(|(id, email, name, role)| {
        Ok(UserAccount::new(
            id,
            EmailAddress::parse(email)?,
            text(name)?,
            role,
            "demo123",
        ))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 17).unwrap()
    }

    #[test]
    fn test_demo_network_matches_published_totals() {
        let seed = EngineSeed::demo(today(), 42).expect("demo seed is valid");
        let totals: Vec<(String, u32)> = seed
            .hospitals
            .iter()
            .map(|h| (h.id().to_string(), h.total_units()))
            .collect();
        assert_eq!(
            totals,
            [
                ("H001".to_string(), 76),
                ("H002".to_string(), 36),
                ("H003".to_string(), 105),
                ("H004".to_string(), 21),
                ("CBB".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_demo_units_include_breached_bb006() {
        let seed = EngineSeed::demo(today(), 42).unwrap();
        let bb006 = seed.units.iter().find(|u| u.id() == "BB006").unwrap();
        assert!(bb006.is_locked());
        assert_eq!(bb006.temperature(), 12.5);
        assert_eq!(bb006.days_to_expiry(today()), 15);
        assert_eq!(seed.users.len(), 4);
    }

    #[test]
    fn test_load_seed_file_reads_yaml() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(
            file,
            r#"
hospitals:
  - id: H010
    name: Harbour Clinic
    latitude: 40.70
    longitude: -74.01
    stock: {{ "O-": 3, "A+": 2 }}
  - id: CBB
    name: Central Blood Bank
    latitude: 40.73
    longitude: -73.98
units:
  - id: BB100
    bloodType: O-
    expiresInDays: 2
    location: H010
  - id: BB101
    bloodType: A+
    expiryDate: 2025-01-10
    temperature: 9.1
    breached: true
    location: H010
"#
        )
        .unwrap();

        let seed = load_seed_file(file.path())
            .expect("seed should parse")
            .into_seed(today(), 42)
            .expect("seed should validate");

        assert_eq!(seed.hospitals[0].total_units(), 5);
        assert_eq!(seed.units[0].temperature(), STORAGE_TEMPERATURE_CELSIUS);
        assert_eq!(seed.units[0].days_to_expiry(today()), 2);
        assert!(seed.units[1].is_locked());
    }

    #[test]
    fn test_unit_without_expiry_is_rejected() {
        let file = SeedFile::parse(
            "units:\n  - id: BB100\n    bloodType: O-\n    location: H010\n",
        )
        .unwrap();
        let err = file.into_seed(today(), 42).expect_err("no expiry given");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }

    #[test]
    fn test_far_future_expiry_is_rejected() {
        let file = SeedFile::parse(
            "units:\n  - id: BB100\n    bloodType: O-\n    expiresInDays: 100000000000\n    location: H010\n",
        )
        .unwrap();
        let err = file.into_seed(today(), 42).expect_err("expiry out of range");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }

    #[test]
    fn test_demo_with_unrepresentable_shelf_life_is_rejected() {
        let err = EngineSeed::demo(today(), 100_000_000).expect_err("collection date out of range");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_seed_file_is_a_read_error() {
        let err = load_seed_file(Path::new("/nonexistent/hemolink-seed.yaml"))
            .expect_err("missing file");
        assert!(matches!(err, ColdChainError::FileRead(_)));
    }
}
