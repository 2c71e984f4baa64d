use crate::domain::models::OAuthToken;
use crate::infrastructure::config::RemoteCalendarConfig;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Holds the OAuth token one remote calendar is read with.
pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError>;
    fn delete_token(&self) -> Result<(), InfraError>;
}

/// Service/account pair naming one secret. Each calendar id gets its own
/// account, so tokens for different calendars never overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    service: String,
    account: String,
}

impl CredentialKey {
    pub fn for_calendar(config: &RemoteCalendarConfig) -> Self {
        Self {
            service: config.credential_service.trim().to_string(),
            account: format!("calendar:{}", config.calendar_id.trim()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.account)
    }
}

/// Raw string secrets addressed by [`CredentialKey`].
pub trait SecretBackend: Send + Sync {
    fn read_secret(&self, key: &CredentialKey) -> Result<Option<String>, InfraError>;
    fn write_secret(&self, key: &CredentialKey, secret: &str) -> Result<(), InfraError>;
    /// Removing an absent secret is not an error.
    fn remove_secret(&self, key: &CredentialKey) -> Result<(), InfraError>;
}

/// The OS keyring (Secret Service, Keychain, Credential Manager).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringBackend;

fn keyring_error(key: &CredentialKey, error: keyring::Error) -> InfraError {
    InfraError::Credential(format!("keyring entry {key}: {error}"))
}

impl KeyringBackend {
    fn entry(key: &CredentialKey) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(key.service(), key.account()).map_err(|error| keyring_error(key, error))
    }
}

impl SecretBackend for KeyringBackend {
    fn read_secret(&self, key: &CredentialKey) -> Result<Option<String>, InfraError> {
        match Self::entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(keyring_error(key, error)),
        }
    }

    fn write_secret(&self, key: &CredentialKey, secret: &str) -> Result<(), InfraError> {
        Self::entry(key)?
            .set_password(secret)
            .map_err(|error| keyring_error(key, error))
    }

    fn remove_secret(&self, key: &CredentialKey) -> Result<(), InfraError> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(keyring_error(key, error)),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySecretBackend {
    secrets: Mutex<HashMap<CredentialKey, String>>,
}

impl InMemorySecretBackend {
    fn secrets(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CredentialKey, String>>, InfraError> {
        self.secrets
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory secrets lock poisoned: {error}")))
    }
}

impl SecretBackend for InMemorySecretBackend {
    fn read_secret(&self, key: &CredentialKey) -> Result<Option<String>, InfraError> {
        Ok(self.secrets()?.get(key).cloned())
    }

    fn write_secret(&self, key: &CredentialKey, secret: &str) -> Result<(), InfraError> {
        self.secrets()?.insert(key.clone(), secret.to_string());
        Ok(())
    }

    fn remove_secret(&self, key: &CredentialKey) -> Result<(), InfraError> {
        self.secrets()?.remove(key);
        Ok(())
    }
}

/// The token of one calendar, stored as JSON under that calendar's key.
#[derive(Debug)]
pub struct CalendarCredentialStore<B>
where
    B: SecretBackend,
{
    backend: Arc<B>,
    key: CredentialKey,
}

pub type KeyringCredentialStore = CalendarCredentialStore<KeyringBackend>;
pub type InMemoryCredentialStore = CalendarCredentialStore<InMemorySecretBackend>;

impl<B> CalendarCredentialStore<B>
where
    B: SecretBackend,
{
    pub fn new(backend: Arc<B>, key: CredentialKey) -> Self {
        Self { backend, key }
    }

    pub fn key(&self) -> &CredentialKey {
        &self.key
    }
}

impl KeyringCredentialStore {
    pub fn for_calendar(config: &RemoteCalendarConfig) -> Self {
        Self::new(Arc::new(KeyringBackend), CredentialKey::for_calendar(config))
    }
}

impl InMemoryCredentialStore {
    pub fn in_memory(config: &RemoteCalendarConfig) -> Self {
        Self::new(
            Arc::new(InMemorySecretBackend::default()),
            CredentialKey::for_calendar(config),
        )
    }
}

impl<B> CredentialStore for CalendarCredentialStore<B>
where
    B: SecretBackend,
{
    fn save_token(&self, token: &OAuthToken) -> Result<(), InfraError> {
        let payload = serde_json::to_string(token)?;
        self.backend.write_secret(&self.key, &payload)?;
        debug!(key = %self.key, "stored calendar token");
        Ok(())
    }

    fn load_token(&self) -> Result<Option<OAuthToken>, InfraError> {
        let Some(payload) = self.backend.read_secret(&self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&payload).map(Some).map_err(|error| {
            InfraError::Credential(format!("token under {} is unreadable: {error}", self.key))
        })
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        self.backend.remove_secret(&self.key)
    }
}
