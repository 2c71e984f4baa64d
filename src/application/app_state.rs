use crate::application::bootstrap::{BootstrapResult, WorkspacePaths, bootstrap_workspace};
use crate::application::event_store::EventStore;
use crate::application::oauth::{AccessTokenSource, OAuthConfig, OAuthManager};
use crate::application::remote_sync::{PollPolicy, RemoteCalendarSync, SyncWindow};
use crate::application::week_view::WeekView;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::KeyringCredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_repository::SqliteEventRepository;
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ReqwestGoogleCalendarClient};
use crate::infrastructure::logging::{DEFAULT_LOG_FILTER, init_logging};
use crate::infrastructure::oauth_client::ReqwestOAuthClient;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type GoogleTokenSource = OAuthManager<KeyringCredentialStore, ReqwestOAuthClient>;
pub type GoogleRemoteSync =
    RemoteCalendarSync<ReqwestGoogleCalendarClient, GoogleTokenSource, SqliteEventRepository>;

/// Wiring for one workspace: config, the SQLite-backed event store and the
/// optional Google poller, all sharing one store.
pub struct AppState {
    paths: WorkspacePaths,
    config: AppConfig,
    store: Arc<EventStore<SqliteEventRepository>>,
}

impl AppState {
    pub fn new(workspace_root: &Path) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        Self::from_bootstrap(bootstrap)
    }

    /// Like [`AppState::new`], additionally installing file logging under `logs/`.
    pub fn initialize(workspace_root: &Path) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        init_logging(&bootstrap.paths.logs_dir, DEFAULT_LOG_FILTER)?;
        Self::from_bootstrap(bootstrap)
    }

    fn from_bootstrap(bootstrap: BootstrapResult) -> Result<Self, InfraError> {
        let BootstrapResult { paths, config } = bootstrap;
        let clock = config.wall_clock()?;
        let repository = Arc::new(SqliteEventRepository::new(
            &paths.database_path,
            config.storage_key.clone(),
        ));
        let store = Arc::new(EventStore::open(repository, config.roster().clone(), clock));
        info!(
            workspace = %paths.workspace_root.display(),
            events = store.snapshot().len(),
            "workspace opened"
        );
        Ok(Self {
            paths,
            config,
            store,
        })
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<EventStore<SqliteEventRepository>> {
        &self.store
    }

    pub fn week_view(&self) -> WeekView<SqliteEventRepository> {
        WeekView::new(Arc::clone(&self.store))
    }

    /// The configured Google poller source, or `None` when remote sync is off.
    pub fn google_remote_sync(&self) -> Result<Option<Arc<GoogleRemoteSync>>, InfraError> {
        if !self.config.remote.enabled {
            return Ok(None);
        }
        let token_source = OAuthManager::new(
            OAuthConfig::from_env()?,
            Arc::new(KeyringCredentialStore::for_calendar(&self.config.remote)),
            Arc::new(ReqwestOAuthClient::new()),
        );
        Ok(Some(self.remote_sync(
            Arc::new(ReqwestGoogleCalendarClient::new()),
            Arc::new(token_source),
        )))
    }

    pub fn remote_sync<C, T>(
        &self,
        calendar_client: Arc<C>,
        token_source: Arc<T>,
    ) -> Arc<RemoteCalendarSync<C, T, SqliteEventRepository>>
    where
        C: GoogleCalendarClient,
        T: AccessTokenSource,
    {
        Arc::new(RemoteCalendarSync::new(
            calendar_client,
            token_source,
            Arc::clone(&self.store),
            self.config.remote.calendar_id.clone(),
            SyncWindow::from_config(&self.config.remote),
        ))
    }

    /// Starts the configured Google poller on `view`. Returns whether one was started.
    /// Must be called within a tokio runtime.
    pub fn start_remote_sync(
        &self,
        view: &mut WeekView<SqliteEventRepository>,
    ) -> Result<bool, InfraError> {
        let Some(sync) = self.google_remote_sync()? else {
            info!("remote calendar sync disabled");
            return Ok(false);
        };
        self.attach_remote_sync(view, sync);
        Ok(true)
    }

    pub fn attach_remote_sync<C, T>(
        &self,
        view: &mut WeekView<SqliteEventRepository>,
        sync: Arc<RemoteCalendarSync<C, T, SqliteEventRepository>>,
    ) where
        C: GoogleCalendarClient + 'static,
        T: AccessTokenSource + 'static,
    {
        view.attach_poller(sync.spawn(PollPolicy::from_config(&self.config.remote)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EventDraft;
    use crate::infrastructure::event_mapper::{CalendarEventDateTime, GoogleCalendarEvent};
    use crate::infrastructure::google_calendar_client::ListEventsRequest;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        root: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let root = std::env::temp_dir().join(format!(
                "kalendae-app-state-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&root).expect("create temp workspace");
            Self { root }
        }

        fn app_state(&self) -> AppState {
            AppState::new(&self.root).expect("app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    struct StaticCalendarClient;

    #[async_trait]
    impl GoogleCalendarClient for StaticCalendarClient {
        async fn list_events(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            _request: ListEventsRequest,
        ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
            Ok(vec![GoogleCalendarEvent {
                id: Some("g-holiday".to_string()),
                summary: Some("Bank holiday".to_string()),
                description: Some("Donna, Mark".to_string()),
                start: CalendarEventDateTime {
                    date: Some("2025-06-09".to_string()),
                    ..CalendarEventDateTime::default()
                },
                end: CalendarEventDateTime {
                    date: Some("2025-06-10".to_string()),
                    ..CalendarEventDateTime::default()
                },
                ..GoogleCalendarEvent::default()
            }])
        }
    }

    struct StaticToken;

    #[async_trait]
    impl AccessTokenSource for StaticToken {
        async fn access_token(&self) -> Result<String, InfraError> {
            Ok("token".to_string())
        }

        async fn refresh_access_token(&self) -> Result<String, InfraError> {
            Ok("token".to_string())
        }
    }

    #[test]
    fn events_persist_across_app_restarts() {
        let workspace = TempWorkspace::new();
        let created = workspace
            .app_state()
            .store()
            .create(EventDraft {
                title: "Swim class".to_string(),
                is_all_day: true,
                start_time: Some("2025-06-10".to_string()),
                participants: vec!["Macy".to_string()],
                ..EventDraft::default()
            })
            .expect("create");

        let reopened = workspace.app_state();
        assert_eq!(reopened.store().get(&created.id), Some(created));
        assert!(reopened.week_view().capabilities().persistence);
    }

    #[test]
    fn disabled_remote_sync_builds_no_poller() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(state.google_remote_sync().expect("remote sync").is_none());
    }

    #[tokio::test]
    async fn attached_poller_merges_into_the_view() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let mut view = state.week_view();
        view.go_to(crate::domain::calendar_date::LocalDate::from_ymd(2025, 6, 9).expect("date"));

        let sync = state.remote_sync(Arc::new(StaticCalendarClient), Arc::new(StaticToken));
        state.attach_remote_sync(&mut view, sync);
        assert!(view.capabilities().remote_merge);

        for _ in 0..200 {
            if !state.store().snapshot().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let layout = view.layout();
        let monday = layout.row("Mark").and_then(|row| row.cells.first()).expect("cell");
        assert_eq!(monday.entries.len(), 1);
        assert_eq!(monday.entries[0].event.id, "g-holiday");

        view.detach_poller();
        assert!(!view.capabilities().remote_merge);
    }
}
