use crate::domain::models::Event;
use std::collections::HashSet;

/// Freshly loaded local events plus previously held remote events the fresh
/// set does not already contain (by id).
pub fn merge_refreshed(previous: &[Event], fresh: Vec<Event>) -> Vec<Event> {
    let mut known: HashSet<String> = fresh.iter().map(|event| event.id.clone()).collect();
    let mut merged = fresh;
    for event in previous.iter().filter(|event| event.is_google_calendar_event) {
        if known.insert(event.id.clone()) {
            merged.push(event.clone());
        }
    }
    merged
}

/// Appends each incoming event whose id is not present yet. Returns how many were appended.
pub fn append_absent<I>(current: &mut Vec<Event>, incoming: I) -> usize
where
    I: IntoIterator<Item = Event>,
{
    let mut known: HashSet<String> = current.iter().map(|event| event.id.clone()).collect();
    let before = current.len();
    for event in incoming {
        if known.insert(event.id.clone()) {
            current.push(event);
        }
    }
    current.len() - before
}
