//! Conversion between wire types and engine types.

use api_shared::wire;
use chrono::{NaiveDate, NaiveTime};
use hemolink_core::donors::{Appointment, Donor, DonorCard, DonorRegistration};
use hemolink_core::{
    BloodType, ColdChainError, ColdChainResult, DashboardStats, EmailAddress, HospitalSummary,
    NonEmptyText, Session, TemperatureUpdate, TransferRecord, TransferRequest, UnitSnapshot,
    Urgency,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

pub(crate) fn date(value: &str) -> ColdChainResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ColdChainError::InvalidInput(format!("invalid date: '{}'", value)))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub(crate) fn time(value: &str) -> ColdChainResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ColdChainError::InvalidInput(format!("invalid time: '{}'", value)))
}

pub(crate) fn user(session: &Session) -> wire::UserRes {
    let profile = session.user();
    wire::UserRes {
        id: profile.id.clone(),
        email: profile.email.to_string(),
        name: profile.name.to_string(),
        role: profile.role.to_string(),
        permissions: session
            .permissions()
            .iter()
            .map(|p| p.to_string())
            .collect(),
    }
}

pub(crate) fn unit(snapshot: &UnitSnapshot) -> wire::BloodUnitRes {
    let u = &snapshot.unit;
    wire::BloodUnitRes {
        id: u.id().to_string(),
        blood_type: u.blood_type().to_string(),
        collection_date: u.collection_date().format(DATE_FORMAT).to_string(),
        expiry_date: u.expiry_date().format(DATE_FORMAT).to_string(),
        days_to_expiry: snapshot.days_to_expiry,
        expiry_class: snapshot.expiry_class.to_string(),
        temperature: u.temperature(),
        temperature_band: snapshot.temperature_band.to_string(),
        status: snapshot.status.to_string(),
        location: u.location().to_string(),
    }
}

pub(crate) fn temperature(update: TemperatureUpdate, today: NaiveDate) -> wire::TemperatureRes {
    wire::TemperatureRes {
        band: update.band.to_string(),
        breached: update.breached,
        unit: unit(&UnitSnapshot::of(update.unit, today)),
    }
}

pub(crate) fn hospital(summary: HospitalSummary) -> wire::HospitalRes {
    wire::HospitalRes {
        id: summary.id,
        name: summary.name,
        lat: summary.latitude,
        lng: summary.longitude,
        total_units: summary.total_units,
        status: summary.status.to_string(),
        stock: summary.stock.map(|stock| {
            stock
                .into_iter()
                .map(|(bt, n)| (bt.to_string(), n))
                .collect()
        }),
    }
}

pub(crate) fn transfer_request(req: &wire::TransferReq) -> ColdChainResult<TransferRequest> {
    Ok(TransferRequest {
        hospital_id: req.hospital_id.trim().to_string(),
        blood_type: req.blood_type.parse::<BloodType>()?,
        units: req.units,
        urgency: match req.urgency.as_deref() {
            Some(u) if !u.trim().is_empty() => u.parse::<Urgency>()?,
            _ => Urgency::default(),
        },
    })
}

pub(crate) fn transfer(record: TransferRecord) -> wire::TransferRes {
    wire::TransferRes {
        id: record.id.to_string(),
        source_id: record.source_id,
        destination_id: record.destination_id,
        blood_type: record.blood_type.to_string(),
        units: record.units,
        urgency: record.urgency.to_string(),
        status: record.status.to_string(),
        unit_ids: record.unit_ids,
        requested_by: record.requested_by,
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}

pub(crate) fn stats(stats: DashboardStats) -> wire::DashboardStatsRes {
    wire::DashboardStatsRes {
        total_units: stats.total_units as u64,
        expiring_units: stats.expiring_units as u64,
        critical_alerts: stats.critical_alerts as u64,
        active_transfers: stats.active_transfers as u64,
        donors_today: stats.donors_today as u64,
        temperatures_normal: stats.temperatures_normal,
    }
}

pub(crate) fn registration(req: wire::DonorRegisterReq) -> ColdChainResult<DonorRegistration> {
    Ok(DonorRegistration {
        name: NonEmptyText::new(&req.name)?,
        phone: req.phone.trim().to_string(),
        email: EmailAddress::parse(&req.email)?,
        blood_type: req.blood_type.parse()?,
        preferred_date: date(&req.preferred_date)?,
        preferred_time: time(&req.preferred_time)?,
    })
}

pub(crate) fn appointment(appointment: &Appointment, donor: &Donor) -> wire::AppointmentRes {
    wire::AppointmentRes {
        id: appointment.id.clone(),
        donor_id: donor.id.clone(),
        name: donor.name.to_string(),
        blood_type: donor.blood_type.to_string(),
        date: appointment.date.format(DATE_FORMAT).to_string(),
        time: appointment.time.format(TIME_FORMAT).to_string(),
        status: appointment.status.to_string(),
        phone: donor.phone.clone(),
    }
}

pub(crate) fn donor_card(card: DonorCard) -> wire::DonorCardRes {
    let appointment = appointment(&card.appointment, &card.donor);
    wire::DonorCardRes {
        id: card.donor.id,
        name: card.donor.name.to_string(),
        blood_type: card.donor.blood_type.to_string(),
        phone: card.donor.phone,
        donations: card.donor.donations,
        last_donation: card
            .donor
            .last_donation
            .map(|d| d.format(DATE_FORMAT).to_string()),
        next_eligible: card
            .next_eligible
            .map(|d| d.format(DATE_FORMAT).to_string()),
        appointment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_accepts_minutes_and_seconds() {
        assert_eq!(time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(time("14:00:00").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert!(time("9am").is_err());
    }

    #[test]
    fn test_transfer_request_defaults_urgency() {
        let req = wire::TransferReq {
            hospital_id: " H004 ".into(),
            blood_type: "o-".into(),
            units: 2,
            urgency: None,
            destination: None,
        };
        let parsed = transfer_request(&req).unwrap();
        assert_eq!(parsed.hospital_id, "H004");
        assert_eq!(parsed.blood_type, BloodType::ONegative);
        assert_eq!(parsed.urgency, Urgency::Normal);
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let err = registration(wire::DonorRegisterReq {
            name: "John Smith".into(),
            phone: "555-0101".into(),
            email: "not-an-email".into(),
            blood_type: "A+".into(),
            preferred_date: "2024-12-20".into(),
            preferred_time: "09:00".into(),
        })
        .expect_err("invalid email");
        assert!(matches!(err, ColdChainError::Text(_)));
    }
}
