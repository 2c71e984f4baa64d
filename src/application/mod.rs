pub mod app_state;
pub mod bootstrap;
pub mod event_store;
pub mod oauth;
pub mod remote_sync;
pub mod week_view;
