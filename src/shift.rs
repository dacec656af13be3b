use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{ShiftInterval, ShiftWindow};

impl ShiftWindow {
    /// A window crosses midnight only when its end is strictly earlier than
    /// its start. Equal bounds describe an instant on the anchor day.
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    /// `None` only when a midnight-crossing window is anchored on the last
    /// representable day.
    pub fn resolve(&self, anchor: NaiveDate) -> Option<ShiftInterval> {
        let end_day = if self.crosses_midnight() {
            anchor.succ_opt()?
        } else {
            anchor
        };
        Some(ShiftInterval {
            start: anchor.and_time(self.start),
            end: end_day.and_time(self.end),
        })
    }

    /// Tests `instant` against this window resolved on `anchor`.
    pub fn contains(&self, anchor: NaiveDate, instant: NaiveDateTime) -> bool {
        self.resolve(anchor)
            .is_some_and(|interval| interval.contains(instant))
    }
}

impl ShiftInterval {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn window(start: u32, end: u32) -> ShiftWindow {
        ShiftWindow {
            start: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        }
    }

    #[test]
    fn day_shift_stays_on_anchor_date() {
        let interval = window(6, 14).resolve(day(5)).unwrap();
        assert_eq!(interval.start, at(5, 6, 0));
        assert_eq!(interval.end, at(5, 14, 0));
    }

    #[test]
    fn night_shift_ends_next_day() {
        let shift = window(22, 6);
        assert!(shift.crosses_midnight());
        let interval = shift.resolve(day(5)).unwrap();
        assert_eq!(interval.start, at(5, 22, 0));
        assert_eq!(interval.end, at(6, 6, 0));
    }

    #[test]
    fn month_end_anchor_rolls_over() {
        let anchor = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let interval = window(22, 6).resolve(anchor).unwrap();
        assert_eq!(interval.end, at(1, 6, 0));
    }

    #[test]
    fn bounds_are_inclusive() {
        let shift = window(6, 14);
        assert!(shift.contains(day(5), at(5, 6, 0)));
        assert!(shift.contains(day(5), at(5, 14, 0)));
        assert!(!shift.contains(day(5), at(5, 14, 1)));
        assert!(!shift.contains(day(5), at(5, 5, 59)));
    }

    #[test]
    fn night_shift_membership_uses_the_anchor() {
        let shift = window(22, 6);
        assert!(shift.contains(day(5), at(6, 3, 0)));
        assert!(!shift.contains(day(6), at(6, 3, 0)));
        assert!(!shift.contains(day(5), at(5, 3, 0)));
    }

    #[test]
    fn night_shift_on_the_last_day_does_not_panic() {
        let shift = window(22, 6);
        assert_eq!(shift.resolve(NaiveDate::MAX), None);
        assert!(!shift.contains(NaiveDate::MAX, NaiveDateTime::MAX));
        assert!(window(0, 23).resolve(NaiveDate::MAX).is_some());
    }

    #[test]
    fn equal_bounds_do_not_wrap() {
        let shift = window(6, 6);
        assert!(!shift.crosses_midnight());
        let interval = shift.resolve(day(5)).unwrap();
        assert_eq!(interval.start, interval.end);
        assert!(interval.contains(at(5, 6, 0)));
    }
}
