//! Family shared calendar core.
//!
//! `domain` holds the week layout engine and has no I/O. `infrastructure`
//! holds the SQLite, Google Calendar, OAuth, keyring, config and logging
//! adapters. `application` wires them into an event store, a remote poller and
//! the week view facade.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::app_state::AppState;
pub use application::event_store::EventStore;
pub use application::remote_sync::{PollPolicy, PollerHandle, RemoteCalendarSync};
pub use application::week_view::{Capabilities, WeekView};
pub use domain::calendar_date::{LocalDate, WallClock};
pub use domain::layout::{DayPosition, LayoutEngine};
pub use domain::models::{Event, EventDraft, Roster};
pub use domain::week::WeekWindow;
pub use domain::week_layout::WeekLayout;
pub use infrastructure::error::InfraError;
