//! Visitor cookie consent and the analytics tag gated on it.

pub mod analytics;
pub mod categories;
pub mod store;

pub use analytics::{
    AnalyticsError, AnalyticsGate, AnalyticsHost, ConsentAction, EmergencyContactMethod,
    GateState, MemoryAnalyticsHost, TagCommand,
};
pub use categories::{consent_router, cookie_categories, CookieCategoryDescription};
pub use store::{
    ConsentBackend, ConsentBackendError, ConsentCategory, ConsentEvent, ConsentPreferences,
    ConsentState, ConsentStore, MemoryConsentBackend, NoopConsentBackend, CONSENT_STORAGE_KEY,
    CONSENT_VERSION,
};
