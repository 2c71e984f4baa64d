use crate::domain::calendar_date::WallClock;
use crate::domain::models::Roster;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_repository::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "kalendae.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 300;
const DEFAULT_LOOKBACK_DAYS: i64 = 7;
const DEFAULT_LOOKAHEAD_DAYS: i64 = 28;
const MAX_WINDOW_DAYS: i64 = 3650;
const DEFAULT_CREDENTIAL_SERVICE: &str = "kalendae.oauth.google";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u64,
    #[serde(default)]
    pub roster: Roster,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// IANA zone name; absent or `"local"` means the host zone.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub remote: RemoteCalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCalendarConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Upper bound for the delay after repeated failures. Absent keeps the
    /// poll interval fixed.
    #[serde(default)]
    pub backoff_ceiling_seconds: Option<u64>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
    /// Keyring service the calendar's OAuth token is filed under.
    #[serde(default = "default_credential_service")]
    pub credential_service: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            roster: Roster::default(),
            storage_key: default_storage_key(),
            timezone: None,
            remote: RemoteCalendarConfig::default(),
        }
    }
}

impl Default for RemoteCalendarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            calendar_id: default_calendar_id(),
            poll_interval_seconds: default_poll_interval_seconds(),
            backoff_ceiling_seconds: None,
            lookback_days: default_lookback_days(),
            lookahead_days: default_lookahead_days(),
            credential_service: default_credential_service(),
        }
    }
}

impl AppConfig {
    pub fn wall_clock(&self) -> Result<WallClock, InfraError> {
        WallClock::from_name(self.timezone.as_deref()).map_err(InfraError::InvalidConfig)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.schema != SUPPORTED_SCHEMA {
            return Err(format!("unsupported schema {}", self.schema));
        }
        if self.roster.is_empty() {
            return Err("roster must name at least one member".to_string());
        }
        if self.storage_key.trim().is_empty() {
            return Err("storageKey must not be empty".to_string());
        }
        WallClock::from_name(self.timezone.as_deref())?;
        self.remote.validate()
    }
}

impl RemoteCalendarConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.calendar_id.trim().is_empty() {
            return Err("remote.calendarId must not be empty".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("remote.pollIntervalSeconds must be positive".to_string());
        }
        if self
            .backoff_ceiling_seconds
            .is_some_and(|ceiling| ceiling < self.poll_interval_seconds)
        {
            return Err(
                "remote.backoffCeilingSeconds must not be below pollIntervalSeconds".to_string(),
            );
        }
        for (field, days) in [
            ("lookbackDays", self.lookback_days),
            ("lookaheadDays", self.lookahead_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(format!(
                    "remote.{field} must be between 0 and {MAX_WINDOW_DAYS}, got {days}"
                ));
            }
        }
        if self.credential_service.trim().is_empty() {
            return Err("remote.credentialService must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_lookahead_days() -> i64 {
    DEFAULT_LOOKAHEAD_DAYS
}

fn default_credential_service() -> String {
    DEFAULT_CREDENTIAL_SERVICE.to_string()
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        save_config(config_dir, &AppConfig::default())?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    let config: AppConfig = serde_json::from_value(read_config(&path)?)?;
    config
        .validate()
        .map_err(|message| InfraError::InvalidConfig(format!("{message} in {}", path.display())))?;
    Ok(config)
}

pub fn save_config(config_dir: &Path, config: &AppConfig) -> Result<(), InfraError> {
    config.validate().map_err(InfraError::InvalidConfig)?;
    let formatted = serde_json::to_string_pretty(config)?;
    fs::write(config_dir.join(CONFIG_FILE_NAME), format!("{formatted}\n"))?;
    Ok(())
}
