//! Donor registration, appointments and the donation interval.
//!
//! A donor may give blood again only on a date strictly after their last donation plus the
//! configured interval (three months by default). Donors are matched by email on registration,
//! so a returning donor keeps their identifier and donation history.

use crate::blood_type::BloodType;
use crate::{ColdChainError, ColdChainResult};
use chrono::{Months, NaiveDate, NaiveTime};
use hemolink_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonorRegistration {
    pub name: NonEmptyText,
    pub phone: String,
    pub email: EmailAddress,
    pub blood_type: BloodType,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: String,
    pub name: NonEmptyText,
    pub phone: String,
    pub email: Option<EmailAddress>,
    pub blood_type: BloodType,
    pub last_donation: Option<NaiveDate>,
    #[serde(default)]
    pub donations: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub donor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

/// What a donor sees after booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonorCard {
    pub donor: Donor,
    pub appointment: Appointment,
    pub next_eligible: Option<NaiveDate>,
}

/// First date strictly after which `last_donation` allows another donation.
pub fn next_eligible_date(last_donation: NaiveDate, interval_months: u32) -> ColdChainResult<NaiveDate> {
    last_donation
        .checked_add_months(Months::new(interval_months))
        .ok_or_else(|| {
            ColdChainError::InvalidInput(format!(
                "donation interval overflows from {}",
                last_donation
            ))
        })
}

/// Checks that `donor` may donate on `date`.
///
/// # Errors
///
/// Returns `ColdChainError::DonationTooSoon` unless `date` is strictly after the next eligible
/// date. A donor who has never donated is always eligible.
pub fn check_eligible(donor: &Donor, date: NaiveDate, interval_months: u32) -> ColdChainResult<()> {
    let Some(last) = donor.last_donation else {
        return Ok(());
    };
    let next_eligible = next_eligible_date(last, interval_months)?;
    if date <= next_eligible {
        return Err(ColdChainError::DonationTooSoon {
            donor_id: donor.id.clone(),
            next_eligible,
        });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct DonorBook {
    donors: BTreeMap<String, Donor>,
    appointments: Vec<Appointment>,
}

#[derive(Debug)]
pub struct DonorRegistry {
    book: RwLock<DonorBook>,
    interval_months: u32,
}

impl DonorRegistry {
    pub fn new(interval_months: u32) -> Self {
        Self {
            book: RwLock::new(DonorBook::default()),
            interval_months,
        }
    }

    /// # Errors
    ///
    /// Returns `ColdChainError::InvalidInput` for duplicate donor ids or an appointment for an
    /// unknown donor.
    pub fn with_records(
        donors: Vec<Donor>,
        appointments: Vec<Appointment>,
        interval_months: u32,
    ) -> ColdChainResult<Self> {
        let mut book = DonorBook::default();
        for donor in donors {
            let id = donor.id.clone();
            if book.donors.insert(id.clone(), donor).is_some() {
                return Err(ColdChainError::InvalidInput(format!(
                    "duplicate donor id: {}",
                    id
                )));
            }
        }
        for appointment in &appointments {
            if !book.donors.contains_key(&appointment.donor_id) {
                return Err(ColdChainError::InvalidInput(format!(
                    "appointment {} references unknown donor {}",
                    appointment.id, appointment.donor_id
                )));
            }
        }
        book.appointments = appointments;
        Ok(Self {
            book: RwLock::new(book),
            interval_months,
        })
    }

    /// Registers (or finds by email) a donor and books an appointment.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `ColdChainError::InvalidInput` if the preferred date is before `today`,
    /// - `ColdChainError::DonationTooSoon` if a returning donor books inside their interval.
    pub fn register(
        &self,
        registration: DonorRegistration,
        today: NaiveDate,
    ) -> ColdChainResult<DonorCard> {
        if registration.preferred_date < today {
            return Err(ColdChainError::InvalidInput(format!(
                "preferred date {} is in the past",
                registration.preferred_date
            )));
        }

        let mut book = self.write()?;
        let existing = book
            .donors
            .values()
            .find(|d| d.email.as_ref() == Some(&registration.email))
            .cloned();

        let donor = match existing {
            Some(mut donor) => {
                check_eligible(&donor, registration.preferred_date, self.interval_months)?;
                donor.name = registration.name;
                donor.phone = registration.phone;
                donor
            }
            None => Donor {
                id: next_id("D", book.donors.keys()),
                name: registration.name,
                phone: registration.phone,
                email: Some(registration.email),
                blood_type: registration.blood_type,
                last_donation: None,
                donations: 0,
            },
        };

        let appointment = Appointment {
            id: next_id("AP", book.appointments.iter().map(|a| &a.id)),
            donor_id: donor.id.clone(),
            date: registration.preferred_date,
            time: registration.preferred_time,
            status: AppointmentStatus::Scheduled,
        };

        let next_eligible = donor
            .last_donation
            .map(|last| next_eligible_date(last, self.interval_months))
            .transpose()?;

        book.donors.insert(donor.id.clone(), donor.clone());
        book.appointments.push(appointment.clone());
        tracing::info!(donor_id = %donor.id, date = %appointment.date, "donation appointment booked");

        Ok(DonorCard {
            donor,
            appointment,
            next_eligible,
        })
    }

    /// Records a donation on `date`, completing any appointment booked for that day.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` for an unknown donor or
    /// `ColdChainError::DonationTooSoon` inside the donation interval.
    /// Records a donation by an eligible donor.
    ///
    /// `intake` runs with the updated donor while the registry is locked and before anything is
    /// committed. If it fails the donor and the appointments are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::NotFound` for an unknown donor, `ColdChainError::DonationTooSoon`
    /// inside the donation interval, or the error of `intake`.
    pub fn record_donation<T>(
        &self,
        donor_id: &str,
        date: NaiveDate,
        intake: impl FnOnce(&Donor) -> ColdChainResult<T>,
    ) -> ColdChainResult<(Donor, T)> {
        let mut book = self.write()?;
        let mut donor = book
            .donors
            .get(donor_id)
            .cloned()
            .ok_or_else(|| ColdChainError::not_found("donor", donor_id))?;
        check_eligible(&donor, date, self.interval_months)?;

        donor.last_donation = Some(date);
        donor.donations += 1;
        let taken = intake(&donor)?;

        book.donors.insert(donor.id.clone(), donor.clone());
        for appointment in book
            .appointments
            .iter_mut()
            .filter(|a| a.donor_id == donor_id && a.date == date)
        {
            appointment.status = AppointmentStatus::Completed;
        }

        tracing::info!(donor_id, %date, "donation recorded");
        Ok((donor, taken))
    }

    /// Scheduled appointments with their donors, ordered by date and time.
    pub fn appointments(&self) -> ColdChainResult<Vec<(Appointment, Donor)>> {
        let book = self.read()?;
        let mut scheduled: Vec<(Appointment, Donor)> = book
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled)
            .filter_map(|a| book.donors.get(&a.donor_id).map(|d| (a.clone(), d.clone())))
            .collect();
        scheduled.sort_by(|(a, _), (b, _)| (a.date, a.time, &a.id).cmp(&(b.date, b.time, &b.id)));
        Ok(scheduled)
    }

    /// Appointments of any status booked for `date`.
    pub fn appointments_on(&self, date: NaiveDate) -> ColdChainResult<usize> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .filter(|a| a.date == date)
            .count())
    }

    fn read(&self) -> ColdChainResult<RwLockReadGuard<'_, DonorBook>> {
        self.book.read().map_err(|_| ColdChainError::StatePoisoned)
    }

    fn write(&self) -> ColdChainResult<RwLockWriteGuard<'_, DonorBook>> {
        self.book.write().map_err(|_| ColdChainError::StatePoisoned)
    }
}

fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a String>) -> String {
    let highest = existing
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix, highest + 1)
}
