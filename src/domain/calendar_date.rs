use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

const NAIVE_DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A calendar day on the household wall clock.
///
/// Built from integer year/month/day components only. All-day events stored as
/// `"2025-03-10"` map to March 10 whatever zone the host runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalDate(NaiveDate);

impl LocalDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses the date portion of a value, i.e. everything before a `T` or space.
    pub fn parse_date_prefix(value: &str) -> Option<Self> {
        let date_part = value.trim().split(['T', ' ']).next()?;
        let mut parts = date_part.split('-');
        let year = parts.next()?.trim().parse::<i32>().ok()?;
        let month = parts.next()?.trim().parse::<u32>().ok()?;
        let day = parts.next()?.trim().parse::<u32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::from_ymd(year, month, day)
    }

    pub fn naive(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    pub fn add_days(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Whole days from `earlier` to `self`; negative when `earlier` is later.
    pub fn days_since(self, earlier: LocalDate) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

impl From<NaiveDate> for LocalDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// The zone instants are projected onto when deriving local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallClock {
    #[default]
    HostLocal,
    Zone(Tz),
}

impl WallClock {
    /// `None`, blank or `"local"` select the host zone; anything else must be an IANA name.
    pub fn from_name(name: Option<&str>) -> Result<Self, String> {
        let Some(name) = name.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::HostLocal);
        };
        if name.eq_ignore_ascii_case("local") {
            return Ok(Self::HostLocal);
        }
        name.parse::<Tz>()
            .map(Self::Zone)
            .map_err(|error| format!("unknown timezone '{name}': {error}"))
    }

    /// Parses an ISO-8601-like value into an instant.
    ///
    /// Values carrying an offset are taken as-is; values without one are wall-clock
    /// times in this zone. A bare date means local midnight.
    pub fn parse_instant(&self, value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return self.resolve_local(naive);
            }
        }
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        self.resolve_local(date.and_hms_opt(0, 0, 0)?)
    }

    pub fn local_date_of(&self, instant: DateTime<Utc>) -> LocalDate {
        match self {
            Self::HostLocal => LocalDate(instant.with_timezone(&Local).date_naive()),
            Self::Zone(tz) => LocalDate(instant.with_timezone(tz).date_naive()),
        }
    }

    pub fn today(&self) -> LocalDate {
        self.local_date_of(Utc::now())
    }

    fn resolve_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::HostLocal => resolve_in_zone(&Local, naive),
            Self::Zone(tz) => resolve_in_zone(tz, naive),
        }
    }
}

// Wall-clock times skipped by a DST jump resolve to the first valid instant after them.
fn resolve_in_zone<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|value| value.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> LocalDate {
        LocalDate::from_ymd(year, month, day).expect("valid date")
    }

    #[test]
    fn parse_date_prefix_ignores_time_portion() {
        assert_eq!(LocalDate::parse_date_prefix("2025-03-10"), Some(date(2025, 3, 10)));
        assert_eq!(
            LocalDate::parse_date_prefix("2025-03-10T23:30:00.000Z"),
            Some(date(2025, 3, 10))
        );
        assert_eq!(
            LocalDate::parse_date_prefix("2025-03-10 08:00"),
            Some(date(2025, 3, 10))
        );
    }

    #[test]
    fn parse_date_prefix_rejects_malformed_values() {
        assert_eq!(LocalDate::parse_date_prefix(""), None);
        assert_eq!(LocalDate::parse_date_prefix("2025-13-01"), None);
        assert_eq!(LocalDate::parse_date_prefix("2025/03/10"), None);
        assert_eq!(LocalDate::parse_date_prefix("2025-03-10-01"), None);
        assert_eq!(LocalDate::parse_date_prefix("tomorrow"), None);
    }

    #[test]
    fn wall_clock_from_name_accepts_local_and_iana_names() {
        assert_eq!(WallClock::from_name(None), Ok(WallClock::HostLocal));
        assert_eq!(WallClock::from_name(Some("  ")), Ok(WallClock::HostLocal));
        assert_eq!(WallClock::from_name(Some("Local")), Ok(WallClock::HostLocal));
        assert_eq!(
            WallClock::from_name(Some("Pacific/Auckland")),
            Ok(WallClock::Zone(chrono_tz::Pacific::Auckland))
        );
        assert!(WallClock::from_name(Some("Mars/Olympus")).is_err());
    }

    #[test]
    fn naive_values_are_wall_clock_times_in_the_zone() {
        let clock = WallClock::Zone(chrono_tz::America::New_York);
        let instant = clock.parse_instant("2025-06-02T09:00").expect("instant");
        assert_eq!(instant.to_rfc3339(), "2025-06-02T13:00:00+00:00");
        assert_eq!(clock.local_date_of(instant), date(2025, 6, 2));
    }

    #[test]
    fn offset_values_are_projected_onto_the_zone() {
        let clock = WallClock::Zone(chrono_tz::Asia::Tokyo);
        let instant = clock
            .parse_instant("2025-06-02T20:30:00Z")
            .expect("instant");
        assert_eq!(clock.local_date_of(instant), date(2025, 6, 3));
    }

    #[test]
    fn skipped_dst_times_still_resolve() {
        let clock = WallClock::Zone(chrono_tz::Europe::Berlin);
        let instant = clock.parse_instant("2025-03-30T02:30").expect("instant");
        assert_eq!(clock.local_date_of(instant), date(2025, 3, 30));
    }

    #[test]
    fn garbage_is_not_an_instant() {
        let clock = WallClock::Zone(chrono_tz::UTC);
        assert!(clock.parse_instant("").is_none());
        assert!(clock.parse_instant("next tuesday").is_none());
        assert!(clock.parse_instant("2025-02-30T10:00").is_none());
    }

    proptest! {
        #[test]
        fn date_prefix_matches_components(year in 1970i32..2100, month in 1u32..=12, day in 1u32..=28) {
            let raw = format!("{year:04}-{month:02}-{day:02}");
            let parsed = LocalDate::parse_date_prefix(&raw).expect("parse");
            prop_assert_eq!((parsed.year(), parsed.month(), parsed.day()), (year, month, day));
            prop_assert_eq!(parsed.to_string(), raw);
        }

        #[test]
        fn days_since_inverts_add_days(offset in -400i64..400) {
            let base = date(2025, 3, 10);
            prop_assert_eq!(base.add_days(offset).days_since(base), offset);
        }
    }
}
