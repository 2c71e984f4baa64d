use crate::domain::calendar_date::{LocalDate, WallClock};
use crate::domain::models::Event;

/// Inclusive span of local calendar days an event covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectiveRange {
    pub start: LocalDate,
    pub end: LocalDate,
}

impl EffectiveRange {
    /// An end before the start collapses onto the start.
    pub fn new(start: LocalDate, end: LocalDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn single(date: LocalDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn is_multi_day(&self) -> bool {
        self.end > self.start
    }

    pub fn contains(&self, date: LocalDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &EffectiveRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn total_days(&self) -> i64 {
        self.end.days_since(self.start) + 1
    }
}

/// Normalizes an event's raw start/end fields into its effective range.
///
/// Returns `None` for unscheduled events (missing or unparseable start).
pub fn effective_range(event: &Event, clock: &WallClock) -> Option<EffectiveRange> {
    let raw_start = event.start_time.as_deref()?;
    let start = local_date(raw_start, event.is_all_day, clock)?;
    let end = event
        .end_time
        .as_deref()
        .and_then(|raw_end| local_date(raw_end, event.is_all_day, clock))
        .unwrap_or(start);
    Some(EffectiveRange::new(start, end))
}

fn local_date(raw: &str, is_all_day: bool, clock: &WallClock) -> Option<LocalDate> {
    if is_all_day {
        LocalDate::parse_date_prefix(raw)
    } else {
        clock
            .parse_instant(raw)
            .map(|instant| clock.local_date_of(instant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> LocalDate {
        LocalDate::from_ymd(year, month, day).expect("valid date")
    }

    fn event(is_all_day: bool, start: Option<&str>, end: Option<&str>) -> Event {
        Event {
            id: "evt".to_string(),
            title: String::new(),
            description: String::new(),
            location: String::new(),
            is_all_day,
            start_time: start.map(ToOwned::to_owned),
            end_time: end.map(ToOwned::to_owned),
            participants: vec!["Mark".to_string()],
            created_at: String::new(),
            is_google_calendar_event: false,
        }
    }

    #[test]
    fn all_day_dates_ignore_the_host_zone() {
        let all_day = event(true, Some("2025-03-10"), None);
        for clock in [
            WallClock::HostLocal,
            WallClock::Zone(chrono_tz::Pacific::Honolulu),
            WallClock::Zone(chrono_tz::Pacific::Kiritimati),
            WallClock::Zone(chrono_tz::UTC),
        ] {
            let range = effective_range(&all_day, &clock).expect("scheduled");
            assert_eq!(range, EffectiveRange::single(date(2025, 3, 10)));
        }
    }

    #[test]
    fn all_day_values_with_time_keep_their_date() {
        let all_day = event(
            true,
            Some("2025-03-10T00:00:00.000Z"),
            Some("2025-03-12T00:00:00.000Z"),
        );
        let range = effective_range(&all_day, &WallClock::Zone(chrono_tz::America::Los_Angeles))
            .expect("scheduled");
        assert_eq!(range.start, date(2025, 3, 10));
        assert_eq!(range.end, date(2025, 3, 12));
        assert_eq!(range.total_days(), 3);
    }

    #[test]
    fn timed_events_use_the_local_date_of_the_instant() {
        let late = event(
            false,
            Some("2025-06-02T22:30:00-04:00"),
            Some("2025-06-03T01:00:00-04:00"),
        );
        let new_york = WallClock::Zone(chrono_tz::America::New_York);
        let range = effective_range(&late, &new_york).expect("scheduled");
        assert_eq!(range.start, date(2025, 6, 2));
        assert_eq!(range.end, date(2025, 6, 3));
        assert!(range.is_multi_day());

        let london = WallClock::Zone(chrono_tz::Europe::London);
        let range = effective_range(&late, &london).expect("scheduled");
        assert_eq!(range, EffectiveRange::single(date(2025, 6, 3)));
    }

    #[test]
    fn missing_end_defaults_to_start() {
        let timed = event(false, Some("2025-06-02T09:00"), None);
        let range = effective_range(&timed, &WallClock::Zone(chrono_tz::UTC)).expect("scheduled");
        assert_eq!(range, EffectiveRange::single(date(2025, 6, 2)));
        assert!(!range.is_multi_day());
    }

    #[test]
    fn malformed_or_missing_start_is_unscheduled() {
        let clock = WallClock::Zone(chrono_tz::UTC);
        assert!(effective_range(&event(false, None, Some("2025-06-02T09:00")), &clock).is_none());
        assert!(effective_range(&event(false, Some("soon"), None), &clock).is_none());
        assert!(effective_range(&event(true, Some(""), None), &clock).is_none());
    }

    #[test]
    fn reversed_range_collapses_to_start() {
        let reversed = event(true, Some("2025-06-05"), Some("2025-06-02"));
        let range = effective_range(&reversed, &WallClock::default()).expect("scheduled");
        assert_eq!(range, EffectiveRange::single(date(2025, 6, 5)));
    }

    fn arb_range() -> impl Strategy<Value = EffectiveRange> {
        (0i64..60, 0i64..10).prop_map(|(offset, length)| {
            let start = date(2025, 1, 1).add_days(offset);
            EffectiveRange::new(start, start.add_days(length))
        })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in arb_range(), b in arb_range()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn range_overlaps_itself(a in arb_range()) {
            prop_assert!(a.overlaps(&a));
        }

        #[test]
        fn overlap_means_a_shared_day(a in arb_range(), b in arb_range()) {
            let mut day = a.start;
            let mut shared = false;
            while day <= a.end {
                shared |= b.contains(day);
                day = day.add_days(1);
            }
            prop_assert_eq!(a.overlaps(&b), shared);
        }
    }
}
