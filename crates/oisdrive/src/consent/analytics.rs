use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info};

use super::store::{ConsentBackend, ConsentCategory, ConsentEvent, ConsentStore};
use crate::config::AnalyticsConfig;

const SCRIPT_HOST: &str = "googletagmanager.com";
const TRACKING_COOKIE_PREFIXES: [&str; 3] = ["_ga", "_gid", "_gat"];

/// Lifecycle of the analytics tag inside one page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    Loading,
    Ready,
    Disabled,
}

/// Commands pushed onto the tag's data layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TagCommand {
    Js(DateTime<Utc>),
    Config {
        measurement_id: String,
        params: Map<String, Value>,
    },
    Event {
        name: String,
        params: Map<String, Value>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("failed to load analytics script {src}: {reason}")]
    ScriptLoad { src: String, reason: String },
}

/// Page capabilities the gate drives: script tags, the tag data layer, cookies.
pub trait AnalyticsHost {
    fn has_script(&self, src_fragment: &str) -> bool;
    fn inject_script(&mut self, src: &str) -> Result<(), AnalyticsError>;
    fn push(&mut self, command: TagCommand);
    fn cookie_names(&self) -> Vec<String>;
    fn expire_cookie(&mut self, name: &str);
}

/// Host that records everything; used by tests and headless previews.
#[derive(Debug, Default)]
pub struct MemoryAnalyticsHost {
    pub scripts: Vec<String>,
    pub commands: Vec<TagCommand>,
    pub cookies: BTreeSet<String>,
    pub fail_script_loads: bool,
}

impl MemoryAnalyticsHost {
    pub fn with_cookies<I, S>(cookies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cookies: cookies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                TagCommand::Event { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl AnalyticsHost for MemoryAnalyticsHost {
    fn has_script(&self, src_fragment: &str) -> bool {
        self.scripts.iter().any(|src| src.contains(src_fragment))
    }

    fn inject_script(&mut self, src: &str) -> Result<(), AnalyticsError> {
        if self.fail_script_loads {
            return Err(AnalyticsError::ScriptLoad {
                src: src.to_string(),
                reason: "network error".to_string(),
            });
        }
        self.scripts.push(src.to_string());
        Ok(())
    }

    fn push(&mut self, command: TagCommand) {
        self.commands.push(command);
    }

    fn cookie_names(&self) -> Vec<String> {
        self.cookies.iter().cloned().collect()
    }

    fn expire_cookie(&mut self, name: &str) {
        self.cookies.remove(name);
    }
}

/// How a visitor reached out in an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyContactMethod {
    Phone,
    Email,
    Form,
}

impl EmergencyContactMethod {
    fn as_str(self) -> &'static str {
        match self {
            EmergencyContactMethod::Phone => "phone",
            EmergencyContactMethod::Email => "email",
            EmergencyContactMethod::Form => "form",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentAction {
    AcceptAll,
    RejectAll,
    Customize,
    SavePreferences,
}

impl ConsentAction {
    fn as_str(self) -> &'static str {
        match self {
            ConsentAction::AcceptAll => "accept_all",
            ConsentAction::RejectAll => "reject_all",
            ConsentAction::Customize => "customize",
            ConsentAction::SavePreferences => "save_preferences",
        }
    }
}

/// Loads and drives the analytics tag only while analytics consent holds.
///
/// The gate owns its state; nothing is kept in process-wide statics, so one
/// gate per page context never leaks into another.
pub struct AnalyticsGate<H, B> {
    host: H,
    consent: Arc<ConsentStore<B>>,
    events: broadcast::Receiver<ConsentEvent>,
    measurement_id: String,
    state: GateState,
    configured: bool,
}

impl<H, B> AnalyticsGate<H, B>
where
    H: AnalyticsHost,
    B: ConsentBackend,
{
    pub fn new(host: H, consent: Arc<ConsentStore<B>>, config: &AnalyticsConfig) -> Self {
        let events = consent.subscribe();
        Self {
            host,
            consent,
            events,
            measurement_id: config.measurement_id.clone(),
            state: GateState::Uninitialized,
            configured: false,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn script_src(&self) -> String {
        format!(
            "https://www.{SCRIPT_HOST}/gtag/js?id={}",
            self.measurement_id
        )
    }

    pub fn mount(&mut self) -> GateState {
        if !self.consent.has_consent_for(ConsentCategory::Analytics) {
            debug!("analytics disabled: no consent for analytics cookies");
            return self.state;
        }
        self.initialize()
    }

    /// Applies every consent notification received since the last call.
    pub fn sync(&mut self) -> GateState {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle(&event);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "consent notifications lagged, re-reading state");
                    if self.consent.has_consent_for(ConsentCategory::Analytics) {
                        self.initialize();
                    } else {
                        self.disable();
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.state
    }

    pub fn handle(&mut self, event: &ConsentEvent) -> GateState {
        match event {
            ConsentEvent::Updated(state) if state.preferences.analytics => self.initialize(),
            ConsentEvent::Updated(_) | ConsentEvent::Cleared => self.disable(),
        }
    }

    fn initialize(&mut self) -> GateState {
        if self.state == GateState::Ready {
            return self.state;
        }

        self.state = GateState::Loading;
        if !self.host.has_script(SCRIPT_HOST) {
            let src = self.script_src();
            if let Err(err) = self.host.inject_script(&src) {
                error!(error = %err, "failed to initialize analytics");
                self.state = GateState::Disabled;
                return self.state;
            }
        }

        if !self.configured {
            let mut params = Map::new();
            params.insert("anonymize_ip".to_string(), json!(true));
            params.insert("allow_google_signals".to_string(), json!(false));
            params.insert("allow_ad_personalization_signals".to_string(), json!(false));
            params.insert("cookie_flags".to_string(), json!("SameSite=Strict;Secure"));

            self.host.push(TagCommand::Js(Utc::now()));
            self.host.push(TagCommand::Config {
                measurement_id: self.measurement_id.clone(),
                params,
            });
            self.configured = true;
        }

        info!("analytics initialized with consent");
        self.state = GateState::Ready;
        self.state
    }

    fn disable(&mut self) -> GateState {
        let doomed: Vec<String> = self
            .host
            .cookie_names()
            .into_iter()
            .filter(|name| {
                TRACKING_COOKIE_PREFIXES
                    .iter()
                    .any(|prefix| name.starts_with(prefix))
            })
            .collect();

        for name in &doomed {
            self.host.expire_cookie(name);
        }

        if self.state != GateState::Disabled {
            info!(purged = doomed.len(), "analytics disabled: consent withdrawn");
        }
        self.configured = false;
        self.state = GateState::Disabled;
        self.state
    }

    /// Checked on every call: the tag must be ready and consent must still hold.
    fn tracking_allowed(&self) -> bool {
        self.state == GateState::Ready && self.consent.has_consent_for(ConsentCategory::Analytics)
    }

    pub fn track_page_view(&mut self, url: &str, title: Option<&str>) -> bool {
        if !self.tracking_allowed() {
            return false;
        }

        let mut params = Map::new();
        if let Some(title) = title {
            params.insert("page_title".to_string(), json!(title));
        }
        params.insert("page_location".to_string(), json!(url));
        self.host.push(TagCommand::Config {
            measurement_id: self.measurement_id.clone(),
            params,
        });
        true
    }

    pub fn track_event(&mut self, name: &str, mut params: Map<String, Value>) -> bool {
        if !self.tracking_allowed() {
            return false;
        }

        params.insert("consent_given".to_string(), json!(true));
        self.host.push(TagCommand::Event {
            name: name.to_string(),
            params,
        });
        true
    }

    pub fn track_form_submission(&mut self, form_name: &str, success: bool) -> bool {
        self.track_event(
            "form_submit",
            object(json!({ "form_name": form_name, "success": success })),
        )
    }

    pub fn track_contact_form_submission(&mut self, service_type: &str, urgency: &str) -> bool {
        self.track_event(
            "contact_form_submit",
            object(json!({
                "service_type": service_type,
                "urgency": urgency,
                "form_type": "contact",
            })),
        )
    }

    pub fn track_service_page_view(&mut self, service_name: &str) -> bool {
        self.track_event(
            "service_page_view",
            object(json!({ "service_name": service_name, "page_type": "service" })),
        )
    }

    pub fn track_emergency_contact(&mut self, method: EmergencyContactMethod) -> bool {
        self.track_event(
            "emergency_contact",
            object(json!({ "contact_method": method.as_str(), "urgency": "high" })),
        )
    }

    pub fn track_cookie_consent(&mut self, action: ConsentAction) -> bool {
        self.track_event(
            "cookie_consent",
            object(json!({ "consent_action": action.as_str() })),
        )
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::store::{ConsentPreferences, MemoryConsentBackend};

    fn consent() -> Arc<ConsentStore<MemoryConsentBackend>> {
        Arc::new(ConsentStore::new(MemoryConsentBackend::default()))
    }

    fn gate(
        host: MemoryAnalyticsHost,
        consent: &Arc<ConsentStore<MemoryConsentBackend>>,
    ) -> AnalyticsGate<MemoryAnalyticsHost, MemoryConsentBackend> {
        AnalyticsGate::new(host, consent.clone(), &AnalyticsConfig::default())
    }

    #[test]
    fn mount_without_consent_stays_uninitialized() {
        let consent = consent();
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);

        assert_eq!(gate.mount(), GateState::Uninitialized);
        assert!(gate.host().scripts.is_empty());
        assert!(!gate.track_page_view("https://oisdrive.com/", None));
    }

    #[test]
    fn mount_with_consent_loads_script_once_and_configures_privacy() {
        let consent = consent();
        consent.accept_all().expect("save");
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);

        assert_eq!(gate.mount(), GateState::Ready);
        assert_eq!(gate.mount(), GateState::Ready);
        assert_eq!(gate.host().scripts.len(), 1);
        assert!(gate.host().scripts[0].contains("id=G-XXXXXXXXXX"));

        let config = gate
            .host()
            .commands
            .iter()
            .find_map(|command| match command {
                TagCommand::Config { params, .. } => Some(params.clone()),
                _ => None,
            })
            .expect("config pushed");
        assert_eq!(config["anonymize_ip"], json!(true));
        assert_eq!(config["allow_ad_personalization_signals"], json!(false));
    }

    #[test]
    fn existing_script_tag_is_not_injected_again() {
        let consent = consent();
        consent.accept_all().expect("save");
        let host = MemoryAnalyticsHost {
            scripts: vec!["https://www.googletagmanager.com/gtag/js?id=G-OTHER".to_string()],
            ..MemoryAnalyticsHost::default()
        };
        let mut gate = gate(host, &consent);

        assert_eq!(gate.mount(), GateState::Ready);
        assert_eq!(gate.host().scripts.len(), 1);
    }

    #[test]
    fn script_failure_leaves_gate_disabled() {
        let consent = consent();
        consent.accept_all().expect("save");
        let host = MemoryAnalyticsHost {
            fail_script_loads: true,
            ..MemoryAnalyticsHost::default()
        };
        let mut gate = gate(host, &consent);

        assert_eq!(gate.mount(), GateState::Disabled);
        assert!(!gate.track_event("custom", Map::new()));
    }

    #[test]
    fn withdrawing_analytics_purges_tracking_cookies() {
        let consent = consent();
        consent.accept_all().expect("save");
        let host = MemoryAnalyticsHost::with_cookies(["_ga", "_ga_ABC", "_gid", "session"]);
        let mut gate = gate(host, &consent);
        gate.mount();

        consent
            .save(ConsentPreferences {
                analytics: false,
                ..ConsentPreferences::accept_all()
            })
            .expect("save");

        assert_eq!(gate.sync(), GateState::Disabled);
        assert_eq!(gate.host().cookie_names(), vec!["session".to_string()]);
    }

    #[test]
    fn clearing_consent_disables_gate() {
        let consent = consent();
        consent.accept_all().expect("save");
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);
        gate.mount();

        consent.clear().expect("clear");
        assert_eq!(gate.sync(), GateState::Disabled);
    }

    #[test]
    fn granting_consent_later_initializes_gate() {
        let consent = consent();
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);
        gate.mount();

        consent.accept_all().expect("save");
        assert_eq!(gate.sync(), GateState::Ready);
        assert!(gate.track_contact_form_submission("data-recovery", "high"));
        assert_eq!(gate.host().events(), vec!["contact_form_submit"]);
    }

    #[test]
    fn tracking_rechecks_consent_on_every_call() {
        let consent = consent();
        consent.accept_all().expect("save");
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);
        gate.mount();

        // Withdrawn but not yet synced: the gate is still Ready.
        consent.reject_all().expect("save");
        assert_eq!(gate.state(), GateState::Ready);
        assert!(!gate.track_page_view("https://oisdrive.com/contact", Some("Contact")));
        assert!(!gate.track_emergency_contact(EmergencyContactMethod::Phone));
    }

    #[test]
    fn events_carry_consent_marker() {
        let consent = consent();
        consent.accept_all().expect("save");
        let mut gate = gate(MemoryAnalyticsHost::default(), &consent);
        gate.mount();

        assert!(gate.track_cookie_consent(ConsentAction::AcceptAll));
        let params = gate
            .host()
            .commands
            .iter()
            .find_map(|command| match command {
                TagCommand::Event { params, .. } => Some(params.clone()),
                _ => None,
            })
            .expect("event pushed");
        assert_eq!(params["consent_given"], json!(true));
        assert_eq!(params["consent_action"], json!("accept_all"));
    }
}
