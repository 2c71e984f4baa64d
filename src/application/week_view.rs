use crate::application::event_store::EventStore;
use crate::application::remote_sync::PollerHandle;
use crate::domain::calendar_date::LocalDate;
use crate::domain::layout::{DayPosition, LayoutEngine};
use crate::domain::models::Event;
use crate::domain::week::{WeekWindow, relative_day_label};
use crate::domain::week_layout::WeekLayout;
use crate::infrastructure::event_repository::EventRepository;
use std::sync::Arc;
use tracing::debug;

/// Which collaborators a view has wired in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub remote_merge: bool,
    pub persistence: bool,
}

/// One week of the family calendar over a shared event store.
///
/// Every query reads a fresh snapshot of the store, so merges from the remote
/// poller show up on the next call.
pub struct WeekView<R>
where
    R: EventRepository,
{
    store: Arc<EventStore<R>>,
    engine: LayoutEngine,
    week: WeekWindow,
    poller: Option<PollerHandle>,
}

impl<R> WeekView<R>
where
    R: EventRepository,
{
    /// Opens on the week containing today on the store's wall clock.
    pub fn new(store: Arc<EventStore<R>>) -> Self {
        let clock = store.clock();
        Self {
            engine: LayoutEngine::new(clock),
            week: WeekWindow::containing(clock.today()),
            store,
            poller: None,
        }
    }

    pub fn store(&self) -> &Arc<EventStore<R>> {
        &self.store
    }

    pub fn week(&self) -> &WeekWindow {
        &self.week
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            remote_merge: self.poller.as_ref().is_some_and(PollerHandle::is_active),
            persistence: self.store.is_persistent(),
        }
    }

    /// Takes ownership of a running poller; any previous one is cancelled.
    pub fn attach_poller(&mut self, poller: PollerHandle) {
        if let Some(previous) = self.poller.replace(poller) {
            previous.cancel();
        }
    }

    pub fn detach_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    pub fn go_to(&mut self, date: LocalDate) {
        self.week = WeekWindow::containing(date);
        debug!(week_start = %self.week.first(), "week view moved");
    }

    pub fn go_to_today(&mut self) {
        self.go_to(self.engine.clock().today());
    }

    pub fn previous_week(&mut self) {
        self.go_to(self.week.previous().first());
    }

    pub fn next_week(&mut self) {
        self.go_to(self.week.next().first());
    }

    pub fn layout(&self) -> WeekLayout {
        let events = self.store.snapshot();
        WeekLayout::compute(&self.engine, &events, &self.week, self.store.roster())
    }

    pub fn events_for_cell(&self, date: LocalDate, participant: &str) -> Vec<Event> {
        let events = self.store.snapshot();
        self.engine
            .events_for_cell(&events, date, participant)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn single_day_events_for_cell(&self, date: LocalDate, participant: &str) -> Vec<Event> {
        let events = self.store.snapshot();
        self.engine
            .single_day_events_for_cell(&events, date, participant)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn multi_day_events_for_cell(&self, date: LocalDate, participant: &str) -> Vec<Event> {
        let events = self.store.snapshot();
        self.engine
            .multi_day_events_for_cell(&events, date, participant)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Lane of the event among the participant's multi-day events; 0 otherwise.
    pub fn lane_for(&self, event_id: &str, participant: &str) -> usize {
        let events = self.store.snapshot();
        events
            .iter()
            .find(|event| event.id == event_id)
            .map(|event| self.engine.lane_for(&events, event, participant))
            .unwrap_or(0)
    }

    pub fn day_position(&self, event_id: &str, date: LocalDate) -> Option<DayPosition> {
        let event = self.store.get(event_id)?;
        self.engine.day_position(&event, date)
    }

    pub fn days_in_week(&self, event_id: &str) -> Vec<LocalDate> {
        self.store
            .get(event_id)
            .map(|event| self.engine.days_in_window(&event, &self.week))
            .unwrap_or_default()
    }

    pub fn day_label(&self, date: LocalDate) -> String {
        relative_day_label(date, self.engine.clock().today())
    }
}
