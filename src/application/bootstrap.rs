use crate::infrastructure::config::{AppConfig, ensure_default_config, load_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATABASE_FILE_NAME: &str = "kalendae.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

impl WorkspacePaths {
    pub fn under(workspace_root: &Path) -> Self {
        let state_dir = workspace_root.join("state");
        Self {
            workspace_root: workspace_root.to_path_buf(),
            config_dir: workspace_root.join("config"),
            logs_dir: workspace_root.join("logs"),
            database_path: state_dir.join(DATABASE_FILE_NAME),
        }
    }
}

#[derive(Debug)]
pub struct BootstrapResult {
    pub paths: WorkspacePaths,
    pub config: AppConfig,
}

/// Creates `config/`, `state/` and `logs/`, writes the default config when
/// missing, loads it and initializes the database schema. Safe to repeat.
pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let paths = WorkspacePaths::under(workspace_root);

    fs::create_dir_all(&paths.config_dir)?;
    if let Some(state_dir) = paths.database_path.parent() {
        fs::create_dir_all(state_dir)?;
    }
    fs::create_dir_all(&paths.logs_dir)?;

    ensure_default_config(&paths.config_dir)?;
    let config = load_config(&paths.config_dir)?;
    initialize_database(&paths.database_path)?;

    Ok(BootstrapResult { paths, config })
}
