use crate::domain::calendar_date::{LocalDate, WallClock};
use crate::domain::date_range::{EffectiveRange, effective_range};
use crate::domain::lanes::LaneAssignment;
use crate::domain::models::Event;
use crate::domain::week::WeekWindow;
use chrono::{DateTime, Utc};

/// Where a date falls inside an event's span, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPosition {
    pub day_number: i64,
    pub total_days: i64,
}

impl DayPosition {
    pub fn shows_connector_top(&self) -> bool {
        self.day_number > 1
    }

    pub fn shows_connector_bottom(&self) -> bool {
        self.day_number < self.total_days
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellRule {
    SingleDayOnly,
    MultiDayOnly,
    Unified,
}

/// Stateless week-grid layout over a caller-supplied event list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutEngine {
    clock: WallClock,
}

impl LayoutEngine {
    pub fn new(clock: WallClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &WallClock {
        &self.clock
    }

    pub fn effective_range(&self, event: &Event) -> Option<EffectiveRange> {
        effective_range(event, &self.clock)
    }

    pub fn is_multi_day(&self, event: &Event) -> bool {
        self.effective_range(event)
            .is_some_and(|range| range.is_multi_day())
    }

    pub fn event_spans_date(&self, event: &Event, date: LocalDate) -> bool {
        self.effective_range(event)
            .is_some_and(|range| range.contains(date))
    }

    /// Inclusive day overlap; unscheduled events overlap nothing.
    pub fn events_overlap(&self, first: &Event, second: &Event) -> bool {
        match (self.effective_range(first), self.effective_range(second)) {
            (Some(first), Some(second)) => first.overlaps(&second),
            _ => false,
        }
    }

    pub fn days_in_window(&self, event: &Event, week: &WeekWindow) -> Vec<LocalDate> {
        let Some(range) = self.effective_range(event) else {
            return Vec::new();
        };
        week.dates()
            .iter()
            .copied()
            .filter(|date| range.contains(*date))
            .collect()
    }

    pub fn day_position(&self, event: &Event, date: LocalDate) -> Option<DayPosition> {
        let range = self.effective_range(event)?;
        position_in(&range, date)
    }

    pub fn single_day_events_for_cell<'a>(
        &self,
        events: &'a [Event],
        date: LocalDate,
        participant: &str,
    ) -> Vec<&'a Event> {
        self.select(events, date, participant, CellRule::SingleDayOnly)
    }

    pub fn multi_day_events_for_cell<'a>(
        &self,
        events: &'a [Event],
        date: LocalDate,
        participant: &str,
    ) -> Vec<&'a Event> {
        self.select(events, date, participant, CellRule::MultiDayOnly)
    }

    /// Everything shown in one (date, participant) cell, in display order.
    pub fn events_for_cell<'a>(
        &self,
        events: &'a [Event],
        date: LocalDate,
        participant: &str,
    ) -> Vec<&'a Event> {
        self.select(events, date, participant, CellRule::Unified)
    }

    pub fn assign_lanes(&self, events: &[Event], participant: &str) -> LaneAssignment {
        LaneAssignment::assign(events.iter().filter_map(|event| {
            if !event.has_participant(participant) {
                return None;
            }
            self.effective_range(event)
                .filter(EffectiveRange::is_multi_day)
                .map(|range| (event.id.as_str(), range))
        }))
    }

    /// Lane of `event` among `participant`'s multi-day events; 0 when it has none.
    pub fn lane_for(&self, events: &[Event], event: &Event, participant: &str) -> usize {
        if !self.is_multi_day(event) {
            return 0;
        }
        self.assign_lanes(events, participant)
            .lane_or_default(&event.id)
    }

    fn select<'a>(
        &self,
        events: &'a [Event],
        date: LocalDate,
        participant: &str,
        rule: CellRule,
    ) -> Vec<&'a Event> {
        let mut selected: Vec<(CellSortKey, &'a Event)> = events
            .iter()
            .filter(|event| event.has_participant(participant))
            .filter_map(|event| {
                let range = self.effective_range(event)?;
                let belongs = match (rule, range.is_multi_day()) {
                    (CellRule::SingleDayOnly, true) | (CellRule::MultiDayOnly, false) => false,
                    (_, true) => range.contains(date),
                    (_, false) => range.start == date,
                };
                belongs.then(|| (self.sort_key(event), event))
            })
            .collect();
        selected.sort_by(|(left, _), (right, _)| left.cmp(right));
        selected.into_iter().map(|(_, event)| event).collect()
    }

    fn sort_key(&self, event: &Event) -> CellSortKey {
        if event.is_all_day {
            let created = self.clock.parse_instant(&event.created_at);
            CellSortKey {
                timed: false,
                unknown: created.is_none(),
                instant: created,
            }
        } else {
            let start = event
                .start_time
                .as_deref()
                .and_then(|raw| self.clock.parse_instant(raw));
            CellSortKey {
                timed: true,
                unknown: start.is_none(),
                instant: start,
            }
        }
    }
}

// All-day before timed, then by instant; unparseable instants go last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CellSortKey {
    timed: bool,
    unknown: bool,
    instant: Option<DateTime<Utc>>,
}

pub(crate) fn position_in(range: &EffectiveRange, date: LocalDate) -> Option<DayPosition> {
    if !range.contains(date) {
        return None;
    }
    Some(DayPosition {
        day_number: date.days_since(range.start) + 1,
        total_days: range.total_days(),
    })
}
