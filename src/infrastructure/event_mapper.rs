use crate::domain::calendar_date::LocalDate;
use crate::domain::models::Event;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::warn;

const STATUS_CANCELLED: &str = "cancelled";

/// Either `date` (all-day) or `dateTime` (timed) is set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct GoogleCalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, deserialize_with = "moment_or_null")]
    pub start: CalendarEventDateTime,
    #[serde(default, deserialize_with = "moment_or_null")]
    pub end: CalendarEventDateTime,
}

fn moment_or_null<'de, D>(deserializer: D) -> Result<CalendarEventDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<CalendarEventDateTime>::deserialize(deserializer)?.unwrap_or_default())
}

/// Maps one remote item to a read-only family event.
///
/// Returns `Ok(None)` for items that never become events (cancelled, no id).
/// Participants come from the comma-separated description; remote calendars
/// carry no participant field the family roster could map onto.
pub fn to_family_event(
    remote: &GoogleCalendarEvent,
    now: DateTime<Utc>,
) -> Result<Option<Event>, InfraError> {
    let Some(id) = non_empty(remote.id.as_deref()) else {
        return Ok(None);
    };
    if remote
        .status
        .as_deref()
        .is_some_and(|status| status.eq_ignore_ascii_case(STATUS_CANCELLED))
    {
        return Ok(None);
    }

    let is_all_day = remote.start.date.is_some();
    let (start_time, end_time) = if is_all_day {
        all_day_bounds(&id, &remote.start, &remote.end)?
    } else {
        (
            non_empty(remote.start.date_time.as_deref()),
            non_empty(remote.end.date_time.as_deref()),
        )
    };
    if start_time.is_none() {
        warn!(event_id = %id, "remote event has no start; it will not be displayed");
    }

    let description = remote.description.clone().unwrap_or_default();
    if description.trim().is_empty() {
        warn!(event_id = %id, "remote event has no description; no participants assigned");
    }

    let created_at = non_empty(remote.created.as_deref())
        .or_else(|| non_empty(remote.updated.as_deref()))
        .unwrap_or_else(|| now.to_rfc3339());

    Ok(Some(Event {
        id,
        title: remote.summary.clone().unwrap_or_default(),
        participants: split_participants(&description),
        description,
        location: remote.location.clone().unwrap_or_default(),
        is_all_day,
        start_time,
        end_time,
        created_at,
        is_google_calendar_event: true,
    }))
}

pub fn split_participants(description: &str) -> Vec<String> {
    description
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// All-day `end.date` is exclusive; the returned end is the inclusive last day.
fn all_day_bounds(
    id: &str,
    start: &CalendarEventDateTime,
    end: &CalendarEventDateTime,
) -> Result<(Option<String>, Option<String>), InfraError> {
    let start_date = parse_all_day(id, start.date.as_deref(), "start.date")?;
    let Some(start_date) = start_date else {
        return Ok((None, None));
    };
    let end_date = parse_all_day(id, end.date.as_deref(), "end.date")?
        .map(|exclusive| exclusive.add_days(-1).max(start_date))
        .unwrap_or(start_date);
    Ok((Some(start_date.to_string()), Some(end_date.to_string())))
}

fn parse_all_day(
    id: &str,
    value: Option<&str>,
    field_name: &str,
) -> Result<Option<LocalDate>, InfraError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    LocalDate::parse_date_prefix(value).map(Some).ok_or_else(|| {
        InfraError::InvalidEvent(format!(
            "remote event {id} has invalid {field_name} '{value}'"
        ))
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
