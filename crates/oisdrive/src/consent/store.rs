use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Key under which the consent record is persisted.
pub const CONSENT_STORAGE_KEY: &str = "oisdrive-consent";
/// Records written with any other version are treated as absent.
pub const CONSENT_VERSION: &str = "1.0";

const EVENT_BUFFER: usize = 16;

/// Cookie categories a visitor accepts or rejects independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentCategory {
    Necessary,
    Analytics,
    Marketing,
    Preferences,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 4] = [
        ConsentCategory::Necessary,
        ConsentCategory::Analytics,
        ConsentCategory::Marketing,
        ConsentCategory::Preferences,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentPreferences {
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
    pub preferences: bool,
}

impl ConsentPreferences {
    pub fn essential_only() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            preferences: false,
        }
    }

    pub fn accept_all() -> Self {
        Self {
            necessary: true,
            analytics: true,
            marketing: true,
            preferences: true,
        }
    }

    pub fn allows(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => self.necessary,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
            ConsentCategory::Preferences => self.preferences,
        }
    }

    /// Necessary cookies can never be refused.
    fn normalized(self) -> Self {
        Self {
            necessary: true,
            ..self
        }
    }
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self::essential_only()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentState {
    pub has_consented: bool,
    pub consent_date: Option<DateTime<Utc>>,
    pub preferences: ConsentPreferences,
    pub schema_version: String,
}

impl Default for ConsentState {
    fn default() -> Self {
        Self {
            has_consented: false,
            consent_date: None,
            preferences: ConsentPreferences::essential_only(),
            schema_version: CONSENT_VERSION.to_string(),
        }
    }
}

/// On-disk shape. Every field is optional so partially written records degrade
/// to defaults instead of failing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConsent {
    #[serde(default)]
    has_consented: bool,
    #[serde(default)]
    consent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    preferences: ConsentPreferences,
    #[serde(default)]
    version: Option<String>,
}

/// Notifications broadcast to listeners in the same context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentEvent {
    Updated(ConsentState),
    Cleared,
}

impl ConsentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConsentEvent::Updated(_) => "consent-updated",
            ConsentEvent::Cleared => "consent-cleared",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsentBackendError {
    #[error("consent storage unavailable: {0}")]
    Unavailable(String),
    #[error("consent record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value persistence the consent store writes through.
pub trait ConsentBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, ConsentBackendError>;
    fn store(&self, key: &str, value: &str) -> Result<(), ConsentBackendError>;
    fn remove(&self, key: &str) -> Result<(), ConsentBackendError>;

    /// False for contexts without client storage; the store then answers with
    /// defaults and ignores writes.
    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct MemoryConsentBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryConsentBackend {
    pub fn with_raw(key: &str, value: &str) -> Self {
        let backend = Self::default();
        if let Ok(mut guard) = backend.entries.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
        backend
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }
}

impl ConsentBackend for MemoryConsentBackend {
    fn load(&self, key: &str) -> Result<Option<String>, ConsentBackendError> {
        let guard = self
            .entries
            .lock()
            .map_err(|err| ConsentBackendError::Unavailable(err.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), ConsentBackendError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|err| ConsentBackendError::Unavailable(err.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConsentBackendError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|err| ConsentBackendError::Unavailable(err.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Backend for server-side rendering: nothing is ever stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConsentBackend;

impl ConsentBackend for NoopConsentBackend {
    fn load(&self, _key: &str) -> Result<Option<String>, ConsentBackendError> {
        Ok(None)
    }

    fn store(&self, _key: &str, _value: &str) -> Result<(), ConsentBackendError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), ConsentBackendError> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Versioned consent record with change notifications.
#[derive(Debug)]
pub struct ConsentStore<B> {
    backend: B,
    events: broadcast::Sender<ConsentEvent>,
}

impl<B: ConsentBackend> ConsentStore<B> {
    pub fn new(backend: B) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { backend, events }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentEvent> {
        self.events.subscribe()
    }

    pub fn get(&self) -> ConsentState {
        let raw = match self.backend.load(CONSENT_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ConsentState::default(),
            Err(err) => {
                warn!(error = %err, "unable to read consent state");
                return ConsentState::default();
            }
        };

        let stored: StoredConsent = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "discarding unreadable consent record");
                return ConsentState::default();
            }
        };

        if stored.version.as_deref() != Some(CONSENT_VERSION) {
            debug!(found = ?stored.version, "consent record version mismatch");
            return ConsentState::default();
        }

        ConsentState {
            has_consented: stored.has_consented,
            consent_date: stored.consent_date,
            preferences: stored.preferences.normalized(),
            schema_version: CONSENT_VERSION.to_string(),
        }
    }

    pub fn save(&self, preferences: ConsentPreferences) -> Result<ConsentState, ConsentBackendError> {
        if !self.backend.is_available() {
            return Ok(ConsentState::default());
        }

        let state = ConsentState {
            has_consented: true,
            consent_date: Some(Utc::now()),
            preferences: preferences.normalized(),
            schema_version: CONSENT_VERSION.to_string(),
        };

        let stored = StoredConsent {
            has_consented: state.has_consented,
            consent_date: state.consent_date,
            preferences: state.preferences,
            version: Some(CONSENT_VERSION.to_string()),
        };
        let encoded = serde_json::to_string(&stored)?;
        self.backend.store(CONSENT_STORAGE_KEY, &encoded)?;

        // No subscribers is not an error.
        let _ = self.events.send(ConsentEvent::Updated(state.clone()));
        Ok(state)
    }

    pub fn accept_all(&self) -> Result<ConsentState, ConsentBackendError> {
        self.save(ConsentPreferences::accept_all())
    }

    pub fn reject_all(&self) -> Result<ConsentState, ConsentBackendError> {
        self.save(ConsentPreferences::essential_only())
    }

    pub fn clear(&self) -> Result<(), ConsentBackendError> {
        if !self.backend.is_available() {
            return Ok(());
        }

        self.backend.remove(CONSENT_STORAGE_KEY)?;
        let _ = self.events.send(ConsentEvent::Cleared);
        Ok(())
    }

    pub fn has_consent_for(&self, category: ConsentCategory) -> bool {
        let state = self.get();
        state.has_consented && state.preferences.allows(category)
    }

    pub fn should_show_banner(&self) -> bool {
        !self.get().has_consented
    }
}
