use crate::domain::calendar_date::LocalDate;

pub const DAYS_IN_WEEK: usize = 7;

/// Seven consecutive dates, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekWindow {
    dates: [LocalDate; DAYS_IN_WEEK],
}

impl WeekWindow {
    /// The Monday-first week that contains `date`; Sunday closes the week.
    pub fn containing(date: LocalDate) -> Self {
        let monday = date.add_days(-i64::from(date.weekday().num_days_from_monday()));
        Self::starting_on(monday)
    }

    fn starting_on(monday: LocalDate) -> Self {
        let mut dates = [monday; DAYS_IN_WEEK];
        for (offset, slot) in dates.iter_mut().enumerate() {
            *slot = monday.add_days(offset as i64);
        }
        Self { dates }
    }

    pub fn dates(&self) -> &[LocalDate; DAYS_IN_WEEK] {
        &self.dates
    }

    pub fn first(&self) -> LocalDate {
        self.dates[0]
    }

    pub fn last(&self) -> LocalDate {
        self.dates[DAYS_IN_WEEK - 1]
    }

    pub fn contains(&self, date: LocalDate) -> bool {
        self.first() <= date && date <= self.last()
    }

    pub fn previous(&self) -> Self {
        Self::starting_on(self.first().add_days(-(DAYS_IN_WEEK as i64)))
    }

    pub fn next(&self) -> Self {
        Self::starting_on(self.first().add_days(DAYS_IN_WEEK as i64))
    }
}

/// English ordinal suffix for a day of the month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (4..=20).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn relative_day_label(date: LocalDate, today: LocalDate) -> String {
    match date.days_since(today) {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        days if days > 0 => format!("in {days} days"),
        days => format!("{} days ago", -days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> LocalDate {
        LocalDate::from_ymd(year, month, day).expect("valid date")
    }

    #[test]
    fn week_starts_on_monday() {
        let week = WeekWindow::containing(date(2025, 6, 4));
        assert_eq!(week.first(), date(2025, 6, 2));
        assert_eq!(week.last(), date(2025, 6, 8));
        assert_eq!(week.first().weekday(), Weekday::Mon);
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        let week = WeekWindow::containing(date(2025, 6, 8));
        assert_eq!(week.first(), date(2025, 6, 2));
    }

    #[test]
    fn navigation_moves_by_whole_weeks() {
        let week = WeekWindow::containing(date(2025, 1, 1));
        assert_eq!(week.first(), date(2024, 12, 30));
        assert_eq!(week.next().first(), date(2025, 1, 6));
        assert_eq!(week.previous().last(), date(2024, 12, 29));
        assert_eq!(week.next().previous(), week);
    }

    #[test]
    fn ordinal_suffixes() {
        let cases = [
            (1, "st"),
            (2, "nd"),
            (3, "rd"),
            (4, "th"),
            (11, "th"),
            (12, "th"),
            (13, "th"),
            (21, "st"),
            (22, "nd"),
            (23, "rd"),
            (30, "th"),
            (31, "st"),
        ];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {day}");
        }
    }

    #[test]
    fn relative_labels() {
        let today = date(2025, 6, 4);
        assert_eq!(relative_day_label(today, today), "Today");
        assert_eq!(relative_day_label(date(2025, 6, 5), today), "Tomorrow");
        assert_eq!(relative_day_label(date(2025, 6, 3), today), "Yesterday");
        assert_eq!(relative_day_label(date(2025, 6, 9), today), "in 5 days");
        assert_eq!(relative_day_label(date(2025, 5, 25), today), "10 days ago");
    }

    proptest! {
        #[test]
        fn window_is_seven_consecutive_days_containing_the_date(offset in 0i64..3650) {
            let day = date(2020, 1, 1).add_days(offset);
            let week = WeekWindow::containing(day);
            prop_assert!(week.contains(day));
            prop_assert_eq!(week.first().weekday(), Weekday::Mon);
            for pair in week.dates().windows(2) {
                prop_assert_eq!(pair[1].days_since(pair[0]), 1);
            }
        }
    }
}
