//! Dashboard counters.

use crate::constants::EXPIRY_WARNING_MAX_DAYS;
use crate::temperature::TemperatureBand;
use crate::unit::UnitSnapshot;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_units: usize,
    /// Units with five days or fewer left, expired units included.
    pub expiring_units: usize,
    /// Breached units.
    pub critical_alerts: usize,
    /// Transfers still submitted.
    pub active_transfers: usize,
    /// Appointments booked for today.
    pub donors_today: usize,
    /// Share of units whose latest reading is in the normal band, as a whole percentage.
    pub temperatures_normal: u8,
}

pub fn summarise(
    snapshots: &[UnitSnapshot],
    active_transfers: usize,
    donors_today: usize,
) -> DashboardStats {
    let total_units = snapshots.len();
    let normal = snapshots
        .iter()
        .filter(|s| s.temperature_band == TemperatureBand::Normal)
        .count();

    DashboardStats {
        total_units,
        expiring_units: snapshots
            .iter()
            .filter(|s| s.days_to_expiry <= EXPIRY_WARNING_MAX_DAYS)
            .count(),
        critical_alerts: snapshots.iter().filter(|s| s.unit.is_locked()).count(),
        active_transfers,
        donors_today,
        temperatures_normal: percentage(normal, total_units),
    }
}

fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blood_type::BloodType;
    use crate::unit::BloodUnit;
    use chrono::{Duration, NaiveDate};

    fn snapshot(id: &str, days: i64, temp: f64, breached: bool) -> UnitSnapshot {
        let today = NaiveDate::from_ymd_opt(2024, 12, 17).unwrap();
        let expiry = today + Duration::days(days);
        let unit = BloodUnit::from_parts(
            id,
            BloodType::APositive,
            expiry - Duration::days(42),
            expiry,
            temp,
            breached,
            "H001",
        )
        .unwrap();
        UnitSnapshot::of(unit, today)
    }

    #[test]
    fn test_summarise_counts_expiring_and_breached() {
        let stats = summarise(
            &[
                snapshot("BB001", 3, 4.2, false),
                snapshot("BB002", 5, 3.8, false),
                snapshot("BB003", 11, 7.0, false),
                snapshot("BB006", 15, 12.5, true),
            ],
            2,
            3,
        );
        assert_eq!(stats.total_units, 4);
        assert_eq!(stats.expiring_units, 2);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.active_transfers, 2);
        assert_eq!(stats.donors_today, 3);
        assert_eq!(stats.temperatures_normal, 50);
    }

    #[test]
    fn test_empty_inventory_reports_all_normal() {
        assert_eq!(summarise(&[], 0, 0).temperatures_normal, 100);
    }
}
