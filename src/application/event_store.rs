use crate::domain::calendar_date::WallClock;
use crate::domain::merge::{append_absent, merge_refreshed};
use crate::domain::models::{Event, EventDraft, Roster};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_repository::EventRepository;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The in-memory event list every query reads from.
///
/// Local events come from the repository; remote events only ever arrive
/// through [`EventStore::merge_remote`] and are read-only here.
pub struct EventStore<R>
where
    R: EventRepository,
{
    repository: Arc<R>,
    events: Mutex<Vec<Event>>,
    roster: Roster,
    clock: WallClock,
    now_provider: NowProvider,
}

impl<R> EventStore<R>
where
    R: EventRepository,
{
    pub fn new(repository: Arc<R>, roster: Roster, clock: WallClock) -> Self {
        Self {
            repository,
            events: Mutex::new(Vec::new()),
            roster,
            clock,
            now_provider: Arc::new(Utc::now),
        }
    }

    /// Builds the store and performs the initial load.
    pub fn open(repository: Arc<R>, roster: Roster, clock: WallClock) -> Self {
        let store = Self::new(repository, roster, clock);
        store.reload();
        store
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn clock(&self) -> WallClock {
        self.clock
    }

    pub fn is_persistent(&self) -> bool {
        self.repository.is_persistent()
    }

    /// Re-reads local events, keeping held remote events the storage does not
    /// contain. Returns the resulting event count.
    pub fn reload(&self) -> usize {
        let fresh = match self.repository.load_all() {
            Ok(events) => events,
            Err(error) => {
                warn!(%error, "failed to load stored events; treating storage as empty");
                Vec::new()
            }
        };
        let mut events = self.lock_events();
        let merged = merge_refreshed(&events, fresh);
        *events = merged;
        debug!(count = events.len(), "event list reloaded");
        events.len()
    }

    /// Appends remote events whose ids are not held yet. Returns how many were added.
    pub fn merge_remote(&self, remote: Vec<Event>) -> usize {
        let incoming = remote.into_iter().map(|mut event| {
            event.is_google_calendar_event = true;
            event
        });
        let mut events = self.lock_events();
        let added = append_absent(&mut events, incoming);
        if added > 0 {
            info!(added, total = events.len(), "merged remote calendar events");
        }
        added
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.lock_events().clone()
    }

    pub fn get(&self, event_id: &str) -> Option<Event> {
        self.lock_events()
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
    }

    pub fn create(&self, draft: EventDraft) -> Result<Event, InfraError> {
        let event = draft.into_new_event(&self.roster, (self.now_provider)());
        event.validate(&self.clock).map_err(InfraError::InvalidEvent)?;
        self.repository.insert(&event)?;
        info!(event_id = %event.id, "event created");
        self.reload();
        Ok(event)
    }

    pub fn update(&self, event_id: &str, draft: EventDraft) -> Result<Event, InfraError> {
        let existing = self.editable(event_id)?;
        let event = draft.into_updated_event(&existing, &self.roster);
        event.validate(&self.clock).map_err(InfraError::InvalidEvent)?;
        if !self.repository.update(&event)? {
            return Err(InfraError::EventNotFound(event_id.to_string()));
        }
        info!(event_id, "event updated");
        self.reload();
        Ok(event)
    }

    pub fn delete(&self, event_id: &str) -> Result<(), InfraError> {
        self.editable(event_id)?;
        if !self.repository.delete(event_id)? {
            return Err(InfraError::EventNotFound(event_id.to_string()));
        }
        info!(event_id, "event deleted");
        self.reload();
        Ok(())
    }

    fn editable(&self, event_id: &str) -> Result<Event, InfraError> {
        let event = self
            .get(event_id)
            .ok_or_else(|| InfraError::EventNotFound(event_id.to_string()))?;
        if event.is_google_calendar_event {
            return Err(InfraError::InvalidEvent(format!(
                "event {event_id} comes from the remote calendar and is read-only"
            )));
        }
        Ok(event)
    }

    fn lock_events(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
