//! Inter-hospital transfers.
//!
//! A transfer moves `units` of one blood type from a source hospital to a destination. The
//! stock counts of both hospitals and the location of the physical units picked for the
//! transfer change in one step: the hospital network, the inventory and the ledger are all
//! write-locked (in that order) for the whole operation and nothing is stored until every
//! check has passed.
//!
//! ## Eligibility
//!
//! The eligible count at the source is its recorded stock for the blood type minus the breached
//! units of that type held there. Physical units are picked earliest-expiring first and breached
//! units are never picked. Stock counts and physical units are separate records, so a hospital
//! may hold more counted stock than tracked units; the count moves in full and as many tracked
//! units as are available move with it.

use crate::blood_type::BloodType;
use crate::hospital::{Hospital, HospitalNetwork, StockLevel};
use crate::inventory::{fifo_candidates, locked_count, InventoryStore};
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ColdChainError;

    fn from_str(s: &str) -> ColdChainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Urgency::Normal),
            "urgent" => Ok(Urgency::Urgent),
            "critical" => Ok(Urgency::Critical),
            other => Err(ColdChainError::InvalidInput(format!(
                "unknown urgency: '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Submitted => "submitted",
            TransferStatus::Accepted => "accepted",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for stock from `hospital_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub hospital_id: String,
    pub blood_type: BloodType,
    pub units: u32,
    pub urgency: Urgency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: Uuid,
    pub source_id: String,
    pub destination_id: String,
    pub blood_type: BloodType,
    pub units: u32,
    pub urgency: Urgency,
    pub status: TransferStatus,
    /// Physical units relocated with this transfer, earliest-expiring first.
    pub unit_ids: Vec<String>,
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a stock move, with what is needed to detect a worsened stock level.
#[derive(Clone, Debug)]
pub struct StockMove {
    pub record: TransferRecord,
    /// The hospital that lost stock, as stored after the move.
    pub depleted: Hospital,
    pub previous_level: StockLevel,
}

#[derive(Debug, Default)]
pub struct TransferCoordinator {
    ledger: RwLock<Vec<TransferRecord>>,
}

impl TransferCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves stock from `request.hospital_id` to `destination` and records the transfer.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ColdChainError::InvalidInput` if `units` is zero or source and destination match,
    /// - `ColdChainError::NotFound` if either hospital is unknown,
    /// - `ColdChainError::InsufficientStock` if `units` exceeds the eligible count,
    /// - `ColdChainError::StockInvariant` if a hospital's totals stop balancing.
    ///
    /// Nothing changes on error.
    #[allow(clippy::too_many_arguments)]
    pub fn request_transfer(
        &self,
        network: &HospitalNetwork,
        inventory: &InventoryStore,
        request: &TransferRequest,
        destination: &str,
        requested_by: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ColdChainResult<StockMove> {
        if request.units == 0 {
            return Err(ColdChainError::InvalidInput(
                "a transfer must move at least one unit".into(),
            ));
        }
        if request.hospital_id == destination {
            return Err(ColdChainError::InvalidInput(format!(
                "source and destination are both {}",
                destination
            )));
        }

        let mut hospitals = network.write()?;
        let mut units = inventory.write()?;
        let mut ledger = self.write()?;

        let mut source = hospitals
            .get(&request.hospital_id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", &request.hospital_id))?;
        let mut target = hospitals
            .get(destination)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", destination))?;

        let locked = locked_count(&units, source.id(), request.blood_type);
        let eligible = source.stock_of(request.blood_type).saturating_sub(locked);
        if request.units > eligible {
            tracing::warn!(
                hospital_id = source.id(),
                blood_type = %request.blood_type,
                requested = request.units,
                eligible,
                "transfer refused"
            );
            return Err(ColdChainError::InsufficientStock {
                hospital_id: source.id().to_string(),
                blood_type: request.blood_type,
                requested: request.units,
                eligible,
            });
        }

        let previous_level = source.status(network.thresholds());
        source.withdraw(request.blood_type, request.units)?;
        target.deposit(request.blood_type, request.units)?;

        let picked: Vec<String> =
            fifo_candidates(&units, source.id(), request.blood_type, today)
                .into_iter()
                .take(request.units as usize)
                .collect();
        for id in &picked {
            if let Some(unit) = units.get_mut(id) {
                unit.relocate(destination);
            }
        }

        let record = TransferRecord {
            id: Uuid::new_v4(),
            source_id: source.id().to_string(),
            destination_id: destination.to_string(),
            blood_type: request.blood_type,
            units: request.units,
            urgency: request.urgency,
            status: TransferStatus::Submitted,
            unit_ids: picked,
            requested_by: requested_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        hospitals.insert(source.id().to_string(), source.clone());
        hospitals.insert(target.id().to_string(), target);
        ledger.push(record.clone());

        tracing::info!(
            transfer_id = %record.id,
            from = %record.source_id,
            to = %record.destination_id,
            blood_type = %record.blood_type,
            units = record.units,
            urgency = %record.urgency,
            "transfer submitted"
        );

        Ok(StockMove {
            record,
            depleted: source,
            previous_level,
        })
    }

    /// Confirms receipt of a submitted transfer.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` for an unknown transfer, or
    /// `ColdChainError::InvalidTransition` unless it is still submitted.
    pub fn accept(&self, id: Uuid, now: DateTime<Utc>) -> ColdChainResult<TransferRecord> {
        let mut ledger = self.write()?;
        let record = find_submitted(&mut ledger, id, TransferStatus::Accepted)?;
        record.status = TransferStatus::Accepted;
        record.updated_at = now;
        tracing::info!(transfer_id = %id, "transfer accepted");
        Ok(record.clone())
    }

    /// Rejects a submitted transfer, returning its stock and units to the source.
    ///
    /// # Errors
    ///
    /// As [`TransferCoordinator::accept`], plus:
    /// - `ColdChainError::InsufficientStock` if the destination no longer holds the stock,
    /// - `ColdChainError::Locked` if a moved unit has since been breached,
    /// - `ColdChainError::InvalidInput` if a moved unit has since left the destination.
    ///
    /// Nothing changes on error.
    pub fn reject(
        &self,
        network: &HospitalNetwork,
        inventory: &InventoryStore,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> ColdChainResult<StockMove> {
        let mut hospitals = network.write()?;
        let mut units = inventory.write()?;
        let mut ledger = self.write()?;

        let record = find_submitted(&mut ledger, id, TransferStatus::Rejected)?;

        let mut source = hospitals
            .get(&record.source_id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", &record.source_id))?;
        let mut target = hospitals
            .get(&record.destination_id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("hospital", &record.destination_id))?;

        for unit_id in &record.unit_ids {
            let unit = units
                .get(unit_id)
                .ok_or_else(|| ColdChainError::not_found("unit", unit_id))?;
            if unit.is_locked() {
                return Err(ColdChainError::Locked(unit_id.clone()));
            }
            if unit.location() != record.destination_id {
                return Err(ColdChainError::InvalidInput(format!(
                    "unit {} is no longer at {}",
                    unit_id, record.destination_id
                )));
            }
        }

        let previous_level = target.status(network.thresholds());
        target.withdraw(record.blood_type, record.units)?;
        source.deposit(record.blood_type, record.units)?;

        for unit_id in &record.unit_ids {
            if let Some(unit) = units.get_mut(unit_id) {
                unit.relocate(&record.source_id);
            }
        }

        record.status = TransferStatus::Rejected;
        record.updated_at = now;
        hospitals.insert(source.id().to_string(), source);
        hospitals.insert(target.id().to_string(), target.clone());

        tracing::info!(transfer_id = %id, "transfer rejected, stock returned");

        Ok(StockMove {
            record: record.clone(),
            depleted: target,
            previous_level,
        })
    }

    /// Every transfer in submission order.
    pub fn list(&self) -> ColdChainResult<Vec<TransferRecord>> {
        Ok(self.read()?.clone())
    }

    /// Transfers still awaiting acceptance or rejection.
    pub fn in_flight_count(&self) -> ColdChainResult<usize> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.status == TransferStatus::Submitted)
            .count())
    }

    fn read(&self) -> ColdChainResult<std::sync::RwLockReadGuard<'_, Vec<TransferRecord>>> {
        self.ledger.read().map_err(|_| ColdChainError::StatePoisoned)
    }

    fn write(&self) -> ColdChainResult<RwLockWriteGuard<'_, Vec<TransferRecord>>> {
        self.ledger.write().map_err(|_| ColdChainError::StatePoisoned)
    }
}

fn find_submitted(
    ledger: &mut [TransferRecord],
    id: Uuid,
    to: TransferStatus,
) -> ColdChainResult<&mut TransferRecord> {
    let record = ledger
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| ColdChainError::not_found("transfer", id.to_string()))?;
    if record.status != TransferStatus::Submitted {
        return Err(ColdChainError::InvalidTransition {
            id: id.to_string(),
            from: record.status,
            to,
        });
    }
    Ok(record)
}
