use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::models::KilnCureTable;

/// Cure applied to a kiln id the cure table does not know: the batch is
/// predicted to exit at its entry time.
pub const MISSING_KILN_CURE_HOURS: f64 = 0.0;

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;

pub fn cure_hours(cure: &KilnCureTable, kiln_id: u32) -> f64 {
    match cure.get(kiln_id) {
        Some(hours) => hours,
        None => {
            debug!(kiln_id, "kiln not in cure table, using zero-hour cure");
            MISSING_KILN_CURE_HOURS
        }
    }
}

pub fn cure_duration(hours: f64) -> Duration {
    Duration::microseconds((hours * MICROS_PER_HOUR).round() as i64)
}

/// `None` when the exit would fall past the last representable instant.
pub fn predict_exit(
    entry: NaiveDateTime,
    kiln_id: u32,
    cure: &KilnCureTable,
) -> Option<NaiveDateTime> {
    entry.checked_add_signed(cure_duration(cure_hours(cure, kiln_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn table() -> KilnCureTable {
        KilnCureTable::from_entries(3, [(1, 12.0), (2, 1.5), (3, 0.25)]).unwrap()
    }

    #[test]
    fn adds_cure_hours_to_entry() {
        assert_eq!(predict_exit(at(5, 20, 0), 1, &table()), Some(at(6, 8, 0)));
    }

    #[test]
    fn keeps_sub_hour_precision() {
        assert_eq!(predict_exit(at(5, 6, 0), 2, &table()), Some(at(5, 7, 30)));
        assert_eq!(predict_exit(at(5, 6, 0), 3, &table()), Some(at(5, 6, 15)));
        assert_eq!(cure_duration(1.0 / 3.0), Duration::minutes(20));
    }

    #[test]
    fn unknown_kiln_exits_at_entry() {
        assert_eq!(predict_exit(at(5, 6, 0), 9, &table()), Some(at(5, 6, 0)));
    }

    #[test]
    fn exit_past_the_calendar_end_is_none() {
        let last = NaiveDateTime::MAX - Duration::minutes(30);
        assert_eq!(predict_exit(last, 1, &table()), None);
        assert_eq!(predict_exit(last, 9, &table()), Some(last));
    }
}
