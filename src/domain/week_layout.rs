//! Whole-week grid for the presentation layer: one row per roster member,
//! seven cells per row.

use crate::domain::calendar_date::LocalDate;
use crate::domain::layout::{DayPosition, LayoutEngine, position_in};
use crate::domain::models::{Event, Roster};
use crate::domain::week::WeekWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEntry {
    pub event: Event,
    pub multi_day: bool,
    /// Set for multi-day events only.
    pub lane: Option<usize>,
    pub position: DayPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLayout {
    pub date: LocalDate,
    pub entries: Vec<CellEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub participant: String,
    /// Lanes needed to stack this participant's multi-day bars.
    pub lane_count: usize,
    pub cells: Vec<CellLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekLayout {
    pub week: WeekWindow,
    pub rows: Vec<ParticipantRow>,
}

impl WeekLayout {
    pub fn compute(engine: &LayoutEngine, events: &[Event], week: &WeekWindow, roster: &Roster) -> Self {
        let rows = roster
            .members()
            .iter()
            .map(|participant| compute_row(engine, events, week, participant))
            .collect();
        Self { week: *week, rows }
    }

    pub fn row(&self, participant: &str) -> Option<&ParticipantRow> {
        self.rows.iter().find(|row| row.participant == participant)
    }

    pub fn cell(&self, participant: &str, date: LocalDate) -> Option<&CellLayout> {
        self.row(participant)?
            .cells
            .iter()
            .find(|cell| cell.date == date)
    }
}

fn compute_row(
    engine: &LayoutEngine,
    events: &[Event],
    week: &WeekWindow,
    participant: &str,
) -> ParticipantRow {
    let lanes = engine.assign_lanes(events, participant);
    let cells = week
        .dates()
        .iter()
        .map(|date| {
            let entries = engine
                .events_for_cell(events, *date, participant)
                .into_iter()
                .filter_map(|event| {
                    let range = engine.effective_range(event)?;
                    let multi_day = range.is_multi_day();
                    Some(CellEntry {
                        event: event.clone(),
                        multi_day,
                        lane: multi_day.then(|| lanes.lane_or_default(&event.id)),
                        position: position_in(&range, *date)?,
                    })
                })
                .collect();
            CellLayout {
                date: *date,
                entries,
            }
        })
        .collect();

    ParticipantRow {
        participant: participant.to_string(),
        lane_count: lanes.lane_count(),
        cells,
    }
}
