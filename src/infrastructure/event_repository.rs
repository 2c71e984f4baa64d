use crate::domain::models::Event;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::KeyValueStore;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

pub const DEFAULT_STORAGE_KEY: &str = "kalendae_events";

/// Whole-array event persistence. Writes are read-modify-write; the last writer wins.
pub trait EventRepository: Send + Sync {
    fn load_all(&self) -> Result<Vec<Event>, InfraError>;
    fn save_all(&self, events: &[Event]) -> Result<(), InfraError>;

    fn is_persistent(&self) -> bool {
        true
    }

    fn insert(&self, event: &Event) -> Result<(), InfraError> {
        let mut events = self.load_all()?;
        if events.iter().any(|existing| existing.id == event.id) {
            return Err(InfraError::InvalidEvent(format!(
                "event id '{}' already exists",
                event.id
            )));
        }
        events.push(event.clone());
        self.save_all(&events)
    }

    /// Replaces the stored event with the same id. Returns false when none is stored.
    fn update(&self, event: &Event) -> Result<bool, InfraError> {
        let mut events = self.load_all()?;
        let Some(slot) = events.iter_mut().find(|existing| existing.id == event.id) else {
            return Ok(false);
        };
        *slot = event.clone();
        self.save_all(&events)?;
        Ok(true)
    }

    fn delete(&self, event_id: &str) -> Result<bool, InfraError> {
        let mut events = self.load_all()?;
        let before = events.len();
        events.retain(|event| event.id != event_id);
        if events.len() == before {
            return Ok(false);
        }
        self.save_all(&events)?;
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteEventRepository {
    storage: KeyValueStore,
    storage_key: String,
}

impl SqliteEventRepository {
    pub fn new(db_path: impl AsRef<Path>, storage_key: impl Into<String>) -> Self {
        Self {
            storage: KeyValueStore::new(db_path),
            storage_key: storage_key.into(),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

impl EventRepository for SqliteEventRepository {
    fn load_all(&self) -> Result<Vec<Event>, InfraError> {
        let Some(raw) = self.storage.get_item(&self.storage_key)? else {
            return Ok(Vec::new());
        };
        decode_events(&raw)
    }

    fn save_all(&self, events: &[Event]) -> Result<(), InfraError> {
        let payload = serde_json::to_string(events)?;
        self.storage.set_item(&self.storage_key, &payload)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventRepository {
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }
}

impl EventRepository for InMemoryEventRepository {
    fn load_all(&self) -> Result<Vec<Event>, InfraError> {
        let events = self
            .events
            .lock()
            .map_err(|error| InfraError::InvalidEvent(format!("event list lock poisoned: {error}")))?;
        Ok(events.clone())
    }

    fn save_all(&self, events: &[Event]) -> Result<(), InfraError> {
        let mut stored = self
            .events
            .lock()
            .map_err(|error| InfraError::InvalidEvent(format!("event list lock poisoned: {error}")))?;
        *stored = events.to_vec();
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Decodes the stored array record by record, skipping records that do not
/// deserialize. An empty value reads as no events.
fn decode_events(raw: &str) -> Result<Vec<Event>, InfraError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut events = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Event>(record) {
            Ok(event) => events.push(event),
            Err(error) => warn!(index, %error, "skipping malformed stored event"),
        }
    }
    Ok(events)
}
