use crate::domain::calendar_date::{LocalDate, WallClock};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

const DEFAULT_ROSTER: [&str; 5] = ["Donna", "Mark", "Zara", "Macy", "Julia"];
const DRAFT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
const DEFAULT_EVENT_LENGTH_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub location: String,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_google_calendar_event: bool,
}

impl Event {
    pub fn has_participant(&self, participant: &str) -> bool {
        self.participants.iter().any(|name| name == participant)
    }

    pub fn validate(&self, clock: &WallClock) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")?;
        let start = self.start_time.as_deref().map(str::trim).unwrap_or_default();
        let end = self.end_time.as_deref().map(str::trim).unwrap_or_default();
        if start.is_empty() || end.is_empty() {
            return Ok(());
        }

        let reversed = if self.is_all_day {
            match (
                LocalDate::parse_date_prefix(start),
                LocalDate::parse_date_prefix(end),
            ) {
                (Some(start), Some(end)) => end < start,
                _ => false,
            }
        } else {
            match (clock.parse_instant(start), clock.parse_instant(end)) {
                (Some(start), Some(end)) => end < start,
                _ => false,
            }
        };
        if reversed {
            return Err("event.end_time must not be before event.start_time".to_string());
        }
        Ok(())
    }
}

/// Ordered list of household members; order drives row order in the week grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Roster(Vec<String>);

impl Roster {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let members = names
            .into_iter()
            .map(Into::into)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self(members)
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|member| member == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Roster members named in `names`, in roster order.
    pub fn retain_members(&self, names: &[String]) -> Vec<String> {
        self.0
            .iter()
            .filter(|member| names.iter().any(|name| name.trim() == member.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(DEFAULT_ROSTER)
    }
}

impl From<Vec<String>> for Roster {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<Roster> for Vec<String> {
    fn from(value: Roster) -> Self {
        value.0
    }
}

/// The editable part of an event, as captured by the event editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl EventDraft {
    pub fn into_new_event(self, roster: &Roster, now: DateTime<Utc>) -> Event {
        let id = generate_event_id(now);
        let created_at = now.to_rfc3339();
        self.into_event(id, created_at, roster)
    }

    /// Applies the draft over `existing`, keeping its identity and creation time.
    pub fn into_updated_event(self, existing: &Event, roster: &Roster) -> Event {
        self.into_event(existing.id.clone(), existing.created_at.clone(), roster)
    }

    fn into_event(self, id: String, created_at: String, roster: &Roster) -> Event {
        let start_time = non_blank(self.start_time);
        let end_time = non_blank(self.end_time).or_else(|| {
            if self.is_all_day {
                None
            } else {
                start_time.as_deref().and_then(default_end_time)
            }
        });
        let participants = roster.retain_members(&self.participants);

        Event {
            id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            is_all_day: self.is_all_day,
            start_time,
            end_time,
            participants,
            created_at,
            is_google_calendar_event: false,
        }
    }
}

pub fn generate_event_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("event_{}_{suffix}", now.timestamp_millis())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}

fn default_end_time(start: &str) -> Option<String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(start) {
        return Some((parsed + Duration::hours(DEFAULT_EVENT_LENGTH_HOURS)).to_rfc3339());
    }
    ["%Y-%m-%dT%H:%M:%S", DRAFT_DATETIME_FORMAT]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(start, format).ok())
        .map(|naive| {
            (naive + Duration::hours(DEFAULT_EVENT_LENGTH_HOURS))
                .format(DRAFT_DATETIME_FORMAT)
                .to_string()
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_event() -> Event {
        Event {
            id: "event_1".to_string(),
            title: "Swim practice".to_string(),
            description: String::new(),
            location: "Pool".to_string(),
            is_all_day: false,
            start_time: Some("2025-06-02T09:00".to_string()),
            end_time: Some("2025-06-02T10:00".to_string()),
            participants: vec!["Zara".to_string()],
            created_at: "2025-05-30T12:00:00.000Z".to_string(),
            is_google_calendar_event: false,
        }
    }

    #[test]
    fn event_deserializes_from_stored_json() {
        let raw = r#"{
            "id": "event_1717000000000_abc123def",
            "title": "Dentist",
            "description": null,
            "location": "",
            "isAllDay": true,
            "startTime": "2025-03-10",
            "endTime": null,
            "participants": ["Mark", "Macy"],
            "createdAt": "2025-03-01T08:00:00.000Z"
        }"#;
        let event: Event = serde_json::from_str(raw).expect("deserialize event");

        assert!(event.is_all_day);
        assert_eq!(event.description, "");
        assert_eq!(event.start_time.as_deref(), Some("2025-03-10"));
        assert_eq!(event.end_time, None);
        assert!(!event.is_google_calendar_event);
        assert!(event.has_participant("Macy"));
        assert!(!event.has_participant("Julia"));
    }

    #[test]
    fn local_events_serialize_without_remote_flag() {
        let json = serde_json::to_value(sample_event()).expect("serialize");
        assert!(json.get("isGoogleCalendarEvent").is_none());
        assert_eq!(json["startTime"], "2025-06-02T09:00");

        let mut remote = sample_event();
        remote.is_google_calendar_event = true;
        let json = serde_json::to_value(remote).expect("serialize");
        assert_eq!(json["isGoogleCalendarEvent"], true);
    }

    #[test]
    fn validate_rejects_empty_id_and_reversed_range() {
        let clock = WallClock::Zone(chrono_tz::UTC);
        assert!(sample_event().validate(&clock).is_ok());

        let mut event = sample_event();
        event.id = "  ".to_string();
        assert!(event.validate(&clock).is_err());

        let mut event = sample_event();
        event.end_time = Some("2025-06-02T08:00".to_string());
        assert!(event.validate(&clock).is_err());

        let mut event = sample_event();
        event.is_all_day = true;
        event.start_time = Some("2025-06-03".to_string());
        event.end_time = Some("2025-06-02".to_string());
        assert!(event.validate(&clock).is_err());
    }

    #[test]
    fn validate_accepts_unscheduled_events() {
        let mut event = sample_event();
        event.start_time = None;
        event.end_time = Some("garbage".to_string());
        assert!(event.validate(&WallClock::default()).is_ok());
    }

    #[test]
    fn roster_trims_and_deduplicates() {
        let roster = Roster::new(["Donna", " Mark ", "", "Donna", "Zara"]);
        assert_eq!(roster.members(), ["Donna", "Mark", "Zara"]);
        assert_eq!(Roster::default().len(), 5);
    }

    #[test]
    fn roster_retains_members_in_roster_order() {
        let roster = Roster::default();
        let picked = roster.retain_members(&[
            "Julia".to_string(),
            "Stranger".to_string(),
            "Donna".to_string(),
        ]);
        assert_eq!(picked, vec!["Donna".to_string(), "Julia".to_string()]);
    }

    #[test]
    fn new_event_from_draft_gets_identity_and_default_end() {
        let now = fixed_time("2025-06-01T10:00:00Z");
        let draft = EventDraft {
            title: " Soccer ".to_string(),
            start_time: Some("2025-06-02T17:30".to_string()),
            participants: vec!["Zara".to_string(), "Nobody".to_string()],
            ..EventDraft::default()
        };
        let event = draft.into_new_event(&Roster::default(), now);

        assert!(event.id.starts_with(&format!("event_{}_", now.timestamp_millis())));
        assert_eq!(event.id.rsplit('_').next().map(str::len), Some(9));
        assert_eq!(event.title, "Soccer");
        assert_eq!(event.end_time.as_deref(), Some("2025-06-02T18:30"));
        assert_eq!(event.participants, vec!["Zara".to_string()]);
        assert_eq!(event.created_at, now.to_rfc3339());
    }

    #[test]
    fn all_day_draft_keeps_missing_end() {
        let draft = EventDraft {
            is_all_day: true,
            start_time: Some("2025-06-02".to_string()),
            end_time: Some("   ".to_string()),
            ..EventDraft::default()
        };
        let event = draft.into_new_event(&Roster::default(), Utc::now());
        assert_eq!(event.end_time, None);
    }

    #[test]
    fn updated_event_keeps_id_and_created_at() {
        let existing = sample_event();
        let draft = EventDraft {
            title: "Swim gala".to_string(),
            start_time: Some("2025-06-03T09:00".to_string()),
            end_time: Some("2025-06-03T12:00".to_string()),
            participants: vec!["Zara".to_string(), "Mark".to_string()],
            ..EventDraft::default()
        };
        let updated = draft.into_updated_event(&existing, &Roster::default());

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.title, "Swim gala");
        assert_eq!(updated.participants, vec!["Mark".to_string(), "Zara".to_string()]);
    }

    #[test]
    fn generated_ids_are_unique() {
        let now = Utc::now();
        assert_ne!(generate_event_id(now), generate_event_id(now));
    }
}
