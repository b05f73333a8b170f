//! The cold-chain engine.
//!
//! [`ColdChainEngine`] owns every store and is the only entry point used by the API and CLI. It
//! checks the caller's permissions, runs the operation against the stores and publishes the
//! resulting events.
//!
//! ## Locking
//!
//! Stores are locked in a fixed order: hospital network, then inventory, then the transfer
//! ledger. Donation intake takes the donor registry while holding the network. Sessions are
//! never held across another store.

use crate::access::{Capabilities, Permission};
use crate::config::CoreConfig;
use crate::constants::STORAGE_TEMPERATURE_CELSIUS;
use crate::donors::{Appointment, Donor, DonorCard, DonorRegistration, DonorRegistry};
use crate::events::{EventBus, InventoryEvent};
use crate::hospital::{Hospital, HospitalNetwork, Stock, StockLevel};
use crate::inventory::InventoryStore;
use crate::seed::EngineSeed;
use crate::session::{Session, SessionStore};
use crate::stats::{self, DashboardStats};
use crate::temperature::TemperatureUpdate;
use crate::transfer::{StockMove, TransferCoordinator, TransferRecord, TransferRequest};
use crate::unit::{BloodUnit, UnitSnapshot};
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A hospital as shown to a session.
///
/// `stock` is `None` unless the session's privacy gate is unlocked; the total is always shown.
#[derive(Clone, Debug, PartialEq)]
pub struct HospitalSummary {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_units: u32,
    pub status: StockLevel,
    pub stock: Option<Stock>,
}

#[derive(Debug)]
pub struct ColdChainEngine {
    cfg: Arc<CoreConfig>,
    network: HospitalNetwork,
    inventory: InventoryStore,
    transfers: TransferCoordinator,
    donors: DonorRegistry,
    sessions: SessionStore,
    events: EventBus,
}

impl ColdChainEngine {
    /// Builds an engine from seed data.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if the home facility is not one of the seeded
    /// hospitals, a unit is held somewhere unknown, or the seed contains duplicates.
    pub fn new(cfg: Arc<CoreConfig>, seed: EngineSeed) -> ColdChainResult<Self> {
        let network = HospitalNetwork::new(seed.hospitals, cfg.stock_thresholds())?;
        if !network.contains(cfg.home_facility())? {
            return Err(ColdChainError::InvalidInput(format!(
                "home facility {} is not a known hospital",
                cfg.home_facility()
            )));
        }
        for unit in &seed.units {
            if !network.contains(unit.location())? {
                return Err(ColdChainError::InvalidInput(format!(
                    "unit {} is held at unknown facility {}",
                    unit.id(),
                    unit.location()
                )));
            }
        }

        let engine = Self {
            inventory: InventoryStore::with_units(seed.units)?,
            donors: DonorRegistry::with_records(
                seed.donors,
                seed.appointments,
                cfg.donation_interval_months(),
            )?,
            sessions: SessionStore::new(seed.users, cfg.privacy_key()),
            transfers: TransferCoordinator::new(),
            events: EventBus::default(),
            network,
            cfg,
        };

        tracing::info!(
            hospitals = engine.network.list()?.len(),
            units = engine.inventory.unit_count()?,
            home_facility = engine.cfg.home_facility(),
            "cold-chain engine ready"
        );
        Ok(engine)
    }

    /// An engine over the built-in demo data.
    pub fn demo(cfg: Arc<CoreConfig>, today: NaiveDate) -> ColdChainResult<Self> {
        let seed = EngineSeed::demo(today, cfg.shelf_life_days())?;
        Self::new(cfg, seed)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Receives breach, low-stock and transfer events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.events.subscribe()
    }

    // Sessions

    pub fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> ColdChainResult<Session> {
        self.sessions.login(email, password, now)
    }

    pub fn logout(&self, token: &str) -> ColdChainResult<bool> {
        self.sessions.logout(token)
    }

    pub fn session(&self, token: &str, now: DateTime<Utc>) -> ColdChainResult<Session> {
        self.sessions.session(token, now)
    }

    pub fn unlock_privacy(&self, token: &str, key: &str, now: DateTime<Utc>) -> ColdChainResult<bool> {
        let unlocked = self.sessions.unlock_privacy(token, key, now)?;
        if !unlocked {
            tracing::warn!("privacy unlock rejected");
        }
        Ok(unlocked)
    }

    pub fn lock_privacy(&self, token: &str, now: DateTime<Utc>) -> ColdChainResult<()> {
        self.sessions.lock_privacy(token, now)
    }

    // Inventory

    /// Every unit, earliest-expiring first.
    pub fn list_inventory(&self, session: &Session, today: NaiveDate) -> ColdChainResult<Vec<UnitSnapshot>> {
        session.require(Permission::Inventory)?;
        self.inventory.list_by_expiry(today)
    }

    pub fn unit(&self, session: &Session, id: &str, today: NaiveDate) -> ColdChainResult<UnitSnapshot> {
        session.require(Permission::Inventory)?;
        Ok(UnitSnapshot::of(self.inventory.get(id)?, today))
    }

    /// Records a temperature reading, publishing `UnitBreached` when it locks the unit.
    pub fn update_temperature(
        &self,
        session: &Session,
        id: &str,
        reading: f64,
        now: DateTime<Utc>,
    ) -> ColdChainResult<TemperatureUpdate> {
        session.require(Permission::Inventory)?;
        let update = self.inventory.apply_temperature_update(id, reading, now)?;
        if update.breached {
            self.events.publish(InventoryEvent::UnitBreached {
                unit_id: update.unit.id().to_string(),
                blood_type: update.unit.blood_type(),
                temperature: update.unit.temperature(),
                location: update.unit.location().to_string(),
            });
        }
        Ok(update)
    }

    /// Moves one unit to `destination`, or to the home facility when none is given.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` for an unknown destination as well as the errors of
    /// [`InventoryStore::mark_transferred`].
    pub fn transfer_unit(
        &self,
        session: &Session,
        id: &str,
        destination: Option<&str>,
    ) -> ColdChainResult<BloodUnit> {
        session.require(Permission::Transfers)?;
        let destination = destination
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(self.cfg.home_facility());
        if !self.network.contains(destination)? {
            return Err(ColdChainError::not_found("hospital", destination));
        }
        self.inventory.mark_transferred(id, destination)
    }

    // Hospitals

    pub fn list_hospitals(&self, session: &Session) -> ColdChainResult<Vec<HospitalSummary>> {
        let thresholds = self.network.thresholds();
        Ok(self
            .network
            .list()?
            .into_iter()
            .map(|h| HospitalSummary {
                id: h.id().to_string(),
                name: h.name().to_string(),
                latitude: h.latitude(),
                longitude: h.longitude(),
                total_units: h.total_units(),
                status: h.status(thresholds),
                stock: session.privacy().reveal(h.stock().clone()),
            })
            .collect())
    }

    // Transfers

    /// Requests stock from `request.hospital_id` for `destination` (the home facility by default).
    pub fn request_transfer(
        &self,
        session: &Session,
        request: &TransferRequest,
        destination: Option<&str>,
        now: DateTime<Utc>,
    ) -> ColdChainResult<TransferRecord> {
        session.require(Permission::Transfers)?;
        let destination = destination
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(self.cfg.home_facility());

        let moved = self.transfers.request_transfer(
            &self.network,
            &self.inventory,
            request,
            destination,
            &session.user().id,
            now.date_naive(),
            now,
        )?;

        self.events.publish(InventoryEvent::TransferSubmitted {
            transfer_id: moved.record.id,
            source_id: moved.record.source_id.clone(),
            destination_id: moved.record.destination_id.clone(),
            blood_type: moved.record.blood_type,
            units: moved.record.units,
            urgency: moved.record.urgency,
        });
        self.publish_if_worse(&moved);

        Ok(moved.record)
    }

    pub fn accept_transfer(&self, session: &Session, id: &str, now: DateTime<Utc>) -> ColdChainResult<TransferRecord> {
        session.require(Permission::Transfers)?;
        self.transfers.accept(parse_transfer_id(id)?, now)
    }

    /// Rejects a transfer and returns its stock to the source.
    pub fn reject_transfer(&self, session: &Session, id: &str, now: DateTime<Utc>) -> ColdChainResult<TransferRecord> {
        session.require(Permission::Transfers)?;
        let moved = self
            .transfers
            .reject(&self.network, &self.inventory, parse_transfer_id(id)?, now)?;
        self.publish_if_worse(&moved);
        Ok(moved.record)
    }

    pub fn list_transfers(&self, session: &Session) -> ColdChainResult<Vec<TransferRecord>> {
        session.require(Permission::Transfers)?;
        self.transfers.list()
    }

    // Donors

    /// Books a donation appointment. Open to the public.
    pub fn register_donor(&self, registration: DonorRegistration, today: NaiveDate) -> ColdChainResult<DonorCard> {
        self.donors.register(registration, today)
    }

    /// Records a donation and takes the collected unit into inventory at `facility` (the home
    /// facility by default).
    ///
    /// The donor, the facility's stock and the new unit change together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` if `date` is after `today` or the unit would
    /// already have expired, `ColdChainError::NotFound` for an unknown donor or facility, and
    /// `ColdChainError::DonationTooSoon` inside the donation interval.
    pub fn record_donation(
        &self,
        session: &Session,
        donor_id: &str,
        date: NaiveDate,
        facility: Option<&str>,
        today: NaiveDate,
    ) -> ColdChainResult<(Donor, BloodUnit)> {
        session.require(Permission::Inventory)?;
        let shelf_life_days = self.cfg.shelf_life_days();
        if date > today {
            return Err(ColdChainError::InvalidInput(format!(
                "donation date {date} is after {today}"
            )));
        }
        if (today - date).num_days() >= shelf_life_days {
            return Err(ColdChainError::InvalidInput(format!(
                "a unit collected on {date} has already expired"
            )));
        }
        let facility = facility
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(self.cfg.home_facility());

        let mut hospitals = self.network.write()?;
        let mut hospital: Hospital = hospitals
            .get(facility)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", facility))?;

        let (donor, unit) = self.donors.record_donation(donor_id, date, |donor| {
            hospital.deposit(donor.blood_type, 1)?;
            self.inventory.admit(|id| {
                BloodUnit::collected(
                    id,
                    donor.blood_type,
                    date,
                    shelf_life_days,
                    STORAGE_TEMPERATURE_CELSIUS,
                    facility,
                )
            })
        })?;
        hospitals.insert(hospital.id().to_string(), hospital);

        Ok((donor, unit))
    }

    pub fn appointments(&self, session: &Session) -> ColdChainResult<Vec<(Appointment, Donor)>> {
        session.require(Permission::Appointments)?;
        self.donors.appointments()
    }

    // Dashboard

    pub fn dashboard_stats(&self, _session: &Session, today: NaiveDate) -> ColdChainResult<DashboardStats> {
        let snapshots = self.inventory.list_by_expiry(today)?;
        Ok(stats::summarise(
            &snapshots,
            self.transfers.in_flight_count()?,
            self.donors.appointments_on(today)?,
        ))
    }

    fn publish_if_worse(&self, moved: &StockMove) {
        let level = moved.depleted.status(self.network.thresholds());
        if level < moved.previous_level {
            tracing::warn!(hospital_id = moved.depleted.id(), %level, "hospital stock level dropped");
            self.events.publish(InventoryEvent::LowStock {
                hospital_id: moved.depleted.id().to_string(),
                level,
                total_units: moved.depleted.total_units(),
            });
        }
    }
}

fn parse_transfer_id(id: &str) -> ColdChainResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| ColdChainError::not_found("transfer", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blood_type::BloodType;
    use crate::transfer::{TransferStatus, Urgency};
    use crate::unit::UnitStatus;
    use chrono::{Duration, NaiveTime};
    use hemolink_types::{EmailAddress, NonEmptyText};

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 12, 17)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn engine() -> ColdChainEngine {
        ColdChainEngine::demo(Arc::new(CoreConfig::default()), now().date_naive())
            .expect("demo engine builds")
    }

    fn login(engine: &ColdChainEngine, who: &str) -> Session {
        engine
            .login(&format!("{who}@hemolink.com"), "demo123", now())
            .expect("demo login")
    }

    #[test]
    fn test_breached_unit_cannot_be_transferred() {
        let engine = engine();
        let doctor = login(&engine, "doctor");
        let err = engine
            .transfer_unit(&doctor, "BB006", None)
            .expect_err("BB006 is breached");
        assert!(matches!(err, ColdChainError::Locked(_)));
    }

    #[test]
    fn test_critical_unit_moves_to_home_facility() {
        let engine = engine();
        let doctor = login(&engine, "doctor");
        let unit = engine.transfer_unit(&doctor, "BB004", None).unwrap();
        assert_eq!(unit.location(), "CBB");

        let snapshot = engine.unit(&doctor, "BB004", now().date_naive()).unwrap();
        assert_eq!(snapshot.status, UnitStatus::Critical);
    }

    #[test]
    fn test_transfer_unit_to_unknown_destination() {
        let engine = engine();
        let admin = login(&engine, "admin");
        let err = engine
            .transfer_unit(&admin, "BB001", Some("H999"))
            .expect_err("unknown destination");
        assert!(matches!(err, ColdChainError::NotFound { kind: "hospital", .. }));
        assert_eq!(engine.unit(&admin, "BB001", now().date_naive()).unwrap().unit.location(), "H001");
    }

    #[test]
    fn test_receptionist_cannot_read_inventory() {
        let engine = engine();
        let receptionist = login(&engine, "receptionist");
        let err = engine
            .list_inventory(&receptionist, now().date_naive())
            .expect_err("no inventory permission");
        assert!(matches!(err, ColdChainError::Forbidden(Permission::Inventory)));
    }

    #[tokio::test]
    async fn test_breach_publishes_event() {
        let engine = engine();
        let mut events = engine.subscribe();
        let lab = login(&engine, "labtech");

        let update = engine.update_temperature(&lab, "BB003", 9.2, now()).unwrap();
        assert!(update.breached);

        match events.recv().await.expect("event published") {
            InventoryEvent::UnitBreached { unit_id, location, .. } => {
                assert_eq!(unit_id, "BB003");
                assert_eq!(location, "H002");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_hospital_stock_masked_until_unlocked() {
        let engine = engine();
        let admin = login(&engine, "admin");

        let masked = engine.list_hospitals(&admin).unwrap();
        assert!(masked.iter().all(|h| h.stock.is_none()));
        assert_eq!(masked[0].total_units, 0, "CBB sorts first and starts empty");

        assert!(!engine.unlock_privacy(admin.token(), "wrong", now()).unwrap());
        assert!(engine.unlock_privacy(admin.token(), "HEMO2024", now()).unwrap());
        let admin = engine.session(admin.token(), now()).unwrap();
        let revealed = engine.list_hospitals(&admin).unwrap();
        let h004 = revealed.iter().find(|h| h.id == "H004").unwrap();
        assert_eq!(h004.stock.as_ref().unwrap()[&BloodType::ONegative], 2);
        assert_eq!(h004.status, StockLevel::Critical);
    }

    #[tokio::test]
    async fn test_request_transfer_publishes_low_stock() {
        let engine = engine();
        let doctor = login(&engine, "doctor");
        let mut events = engine.subscribe();

        let record = engine
            .request_transfer(
                &doctor,
                &TransferRequest {
                    hospital_id: "H002".into(),
                    blood_type: BloodType::OPositive,
                    units: 11,
                    urgency: Urgency::Critical,
                },
                None,
                now(),
            )
            .expect("11 of 12 O+ eligible, one breached");
        assert_eq!(record.status, TransferStatus::Submitted);
        assert_eq!(record.destination_id, "CBB");

        assert!(matches!(
            events.recv().await.unwrap(),
            InventoryEvent::TransferSubmitted { units: 11, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            InventoryEvent::LowStock { level: StockLevel::Critical, total_units: 25, .. }
        ));

        let stats = engine.dashboard_stats(&doctor, now().date_naive()).unwrap();
        assert_eq!(stats.active_transfers, 1);
    }

    #[test]
    fn test_insufficient_stock_for_h004() {
        let engine = engine();
        let doctor = login(&engine, "doctor");
        let err = engine
            .request_transfer(
                &doctor,
                &TransferRequest {
                    hospital_id: "H004".into(),
                    blood_type: BloodType::ONegative,
                    units: 5,
                    urgency: Urgency::Urgent,
                },
                None,
                now(),
            )
            .expect_err("only 2 O- at H004");
        assert!(matches!(err, ColdChainError::InsufficientStock { eligible: 2, .. }));
    }

    #[test]
    fn test_reject_transfer_with_bad_id_is_not_found() {
        let engine = engine();
        let doctor = login(&engine, "doctor");
        let err = engine
            .reject_transfer(&doctor, "not-a-uuid", now())
            .expect_err("malformed id");
        assert!(matches!(err, ColdChainError::NotFound { kind: "transfer", .. }));
    }

    #[test]
    fn test_donation_adds_unit_and_stock() {
        let engine = engine();
        let lab = login(&engine, "labtech");
        let today = now().date_naive();

        let card = engine
            .register_donor(
                DonorRegistration {
                    name: NonEmptyText::new("Ada Byron").unwrap(),
                    phone: "555-0199".into(),
                    email: EmailAddress::parse("ada@example.com").unwrap(),
                    blood_type: BloodType::ONegative,
                    preferred_date: today,
                    preferred_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                },
                today,
            )
            .unwrap();

        let collected = today - Duration::days(30);
        let (donor, unit) = engine
            .record_donation(&lab, &card.donor.id, collected, None, today)
            .expect("first donation");
        assert_eq!(donor.last_donation, Some(collected));
        assert_eq!(unit.id(), "BB009");
        assert_eq!(unit.location(), "CBB");
        assert_eq!(unit.expiry_date(), collected + Duration::days(42));

        let admin = login(&engine, "admin");
        engine.unlock_privacy(admin.token(), "HEMO2024", now()).unwrap();
        let admin = engine.session(admin.token(), now()).unwrap();
        let cbb = engine
            .list_hospitals(&admin)
            .unwrap()
            .into_iter()
            .find(|h| h.id == "CBB")
            .unwrap();
        assert_eq!(cbb.stock.unwrap()[&BloodType::ONegative], 1);

        let err = engine
            .record_donation(&lab, &card.donor.id, today, None, today)
            .expect_err("inside the donation interval");
        assert!(matches!(err, ColdChainError::DonationTooSoon { .. }));
    }

    #[test]
    fn test_far_future_donation_is_rejected_and_changes_nothing() {
        let engine = engine();
        let lab = login(&engine, "labtech");
        let admin = login(&engine, "admin");
        let today = now().date_naive();
        let far_future = NaiveDate::MAX;

        let err = engine
            .record_donation(&lab, "D001", far_future, None, today)
            .expect_err("future donation date");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));

        let err = engine
            .record_donation(&lab, "D001", today - Duration::days(42), None, today)
            .expect_err("unit would already be expired");
        assert!(matches!(err, ColdChainError::InvalidInput(_)));

        assert_eq!(engine.list_inventory(&admin, today).unwrap().len(), 8);
        assert!(engine.list_hospitals(&admin).is_ok());
        let (donor, _) = engine
            .record_donation(&lab, "D001", today, None, today)
            .expect("donor untouched by the refused donations");
        assert_eq!(donor.donations, 1);
    }

    #[test]
    fn test_donation_to_unknown_facility_leaves_donor_eligible() {
        let engine = engine();
        let lab = login(&engine, "labtech");
        let today = now().date_naive();

        let err = engine
            .record_donation(&lab, "D002", today, Some("H999"), today)
            .expect_err("unknown facility");
        assert!(matches!(err, ColdChainError::NotFound { kind: "hospital", .. }));

        let (donor, unit) = engine
            .record_donation(&lab, "D002", today, None, today)
            .expect("donor still eligible");
        assert_eq!(donor.donations, 1);
        assert_eq!(unit.id(), "BB009");
    }

    #[test]
    fn test_dashboard_stats_for_demo_data() {
        let engine = engine();
        let admin = login(&engine, "admin");
        let stats = engine.dashboard_stats(&admin, now().date_naive()).unwrap();
        assert_eq!(stats.total_units, 8);
        assert_eq!(stats.expiring_units, 4);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.active_transfers, 0);
        assert_eq!(stats.donors_today, 0);
        assert_eq!(stats.temperatures_normal, 88);
    }
}
