use crate::application::event_store::EventStore;
use crate::application::oauth::AccessTokenSource;
use crate::domain::models::Event;
use crate::infrastructure::config::RemoteCalendarConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{GoogleCalendarEvent, to_family_event};
use crate::infrastructure::event_repository::EventRepository;
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ListEventsRequest};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Delay between polls. With a ceiling, consecutive failures double the delay
/// up to that ceiling; without one the interval stays fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: StdDuration,
    pub backoff_ceiling: Option<StdDuration>,
}

impl PollPolicy {
    pub fn fixed(interval: StdDuration) -> Self {
        Self {
            interval,
            backoff_ceiling: None,
        }
    }

    pub fn from_config(config: &RemoteCalendarConfig) -> Self {
        Self {
            interval: StdDuration::from_secs(config.poll_interval_seconds),
            backoff_ceiling: config.backoff_ceiling_seconds.map(StdDuration::from_secs),
        }
    }

    pub fn delay_after(&self, consecutive_failures: u32) -> StdDuration {
        let Some(ceiling) = self.backoff_ceiling else {
            return self.interval;
        };
        if consecutive_failures == 0 {
            return self.interval;
        }
        let factor = 2u32.saturating_pow(consecutive_failures.min(16));
        self.interval.saturating_mul(factor).min(ceiling.max(self.interval))
    }
}

/// Days before and after "now" the remote calendar is read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub lookback_days: i64,
    pub lookahead_days: i64,
}

impl SyncWindow {
    pub fn from_config(config: &RemoteCalendarConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            lookahead_days: config.lookahead_days,
        }
    }

    fn request_at(&self, now: DateTime<Utc>) -> Result<ListEventsRequest, InfraError> {
        let out_of_range = || {
            InfraError::InvalidConfig(format!(
                "remote sync window of -{}/+{} days around {now} is out of range",
                self.lookback_days, self.lookahead_days
            ))
        };
        let time_min = Duration::try_days(self.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or_else(out_of_range)?;
        let time_max = Duration::try_days(self.lookahead_days)
            .and_then(|lookahead| now.checked_add_signed(lookahead))
            .ok_or_else(out_of_range)?;
        Ok(ListEventsRequest {
            time_min: Some(time_min),
            time_max: Some(time_max),
        })
    }
}

pub struct RemoteCalendarSync<C, T, R>
where
    C: GoogleCalendarClient,
    T: AccessTokenSource,
    R: EventRepository,
{
    calendar_client: Arc<C>,
    token_source: Arc<T>,
    store: Arc<EventStore<R>>,
    calendar_id: String,
    window: SyncWindow,
    now_provider: NowProvider,
}

impl<C, T, R> RemoteCalendarSync<C, T, R>
where
    C: GoogleCalendarClient,
    T: AccessTokenSource,
    R: EventRepository,
{
    pub fn new(
        calendar_client: Arc<C>,
        token_source: Arc<T>,
        store: Arc<EventStore<R>>,
        calendar_id: impl Into<String>,
        window: SyncWindow,
    ) -> Self {
        Self {
            calendar_client,
            token_source,
            store,
            calendar_id: calendar_id.into(),
            window,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Fetches and normalizes the remote window. A 401 triggers exactly one
    /// credential refresh and one retry.
    pub async fn fetch_events(&self) -> Result<Vec<Event>, InfraError> {
        let now = (self.now_provider)();
        let request = self.window.request_at(now)?;

        let access_token = self.token_source.access_token().await?;
        let items = match self.list(&access_token, request.clone()).await {
            Err(InfraError::Unauthorized(message)) => {
                warn!(%message, "remote calendar rejected credentials; refreshing once");
                let refreshed = self.token_source.refresh_access_token().await?;
                self.list(&refreshed, request).await?
            }
            other => other?,
        };

        Ok(normalize(items, now))
    }

    /// One poll tick. Results that arrive after `alive` was cleared are dropped.
    pub async fn poll_once(&self, alive: &AtomicBool) -> Result<usize, InfraError> {
        let events = self.fetch_events().await?;
        if !alive.load(Ordering::SeqCst) {
            debug!(fetched = events.len(), "poller cancelled; discarding remote results");
            return Ok(0);
        }
        Ok(self.store.merge_remote(events))
    }

    async fn list(
        &self,
        access_token: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        self.calendar_client
            .list_events(access_token, &self.calendar_id, request)
            .await
    }
}

impl<C, T, R> RemoteCalendarSync<C, T, R>
where
    C: GoogleCalendarClient + 'static,
    T: AccessTokenSource + 'static,
    R: EventRepository + 'static,
{
    /// Polls immediately and then after every `policy` delay until cancelled.
    /// Must be called within a tokio runtime.
    pub fn spawn(self: Arc<Self>, policy: PollPolicy) -> PollerHandle {
        let alive = Arc::new(AtomicBool::new(true));
        let task_alive = Arc::clone(&alive);
        info!(
            calendar_id = %self.calendar_id,
            interval_seconds = policy.interval.as_secs(),
            "starting remote calendar poller"
        );

        let task = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            while task_alive.load(Ordering::SeqCst) {
                match self.poll_once(&task_alive).await {
                    Ok(added) => {
                        consecutive_failures = 0;
                        debug!(added, "remote calendar poll finished");
                    }
                    Err(poll_error) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        error!(error = %poll_error, consecutive_failures, "remote calendar poll failed");
                    }
                }
                sleep(policy.delay_after(consecutive_failures)).await;
            }
        });

        PollerHandle { alive, task }
    }
}

fn normalize(items: Vec<GoogleCalendarEvent>, now: DateTime<Utc>) -> Vec<Event> {
    items
        .iter()
        .filter_map(|item| match to_family_event(item, now) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "skipping remote event that could not be mapped");
                None
            }
        })
        .collect()
}

/// Owner of a running poller. Dropping the handle cancels the poller.
#[derive(Debug)]
pub struct PollerHandle {
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("remote calendar poller cancelled");
        }
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
