use crate::infrastructure::error::InfraError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const LOG_FILE_NAME: &str = "kalendae.log";
pub const LOG_FILTER_ENV: &str = "KALENDAE_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Installs the global subscriber appending to `logs_dir/kalendae.log`.
///
/// The filter comes from `KALENDAE_LOG`, falling back to `default_filter`.
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(logs_dir: &Path, default_filter: &str) -> Result<bool, InfraError> {
    let log_path = log_file_path(logs_dir);
    fs::create_dir_all(logs_dir)?;
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(path = %log_path.display(), "logging initialized");
    }
    Ok(installed)
}

pub fn log_file_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn init_logging_creates_log_file_and_tolerates_second_call() {
        let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "kalendae-logging-tests-{}-{}",
            std::process::id(),
            sequence
        ));
        let logs_dir = root.join("logs");

        init_logging(&logs_dir, DEFAULT_LOG_FILTER).expect("first init");
        let second = init_logging(&logs_dir, DEFAULT_LOG_FILTER).expect("second init");

        assert!(!second);
        assert!(log_file_path(&logs_dir).exists());
        let _ = fs::remove_dir_all(root);
    }
}
