use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_BUCKET: &str = "oisdrive-attachments";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MAILGUN_URL: &str = "https://api.mailgun.net";
const DEFAULT_FROM_EMAIL: &str = "OISDRIVE <noreply@oisdrive.com>";
const DEFAULT_SITE_URL: &str = "https://oisdrive.com";
const DEFAULT_CONTACT_EMAIL: &str = "contact@oisdrive.com";
const DEFAULT_CONTACT_PHONE: &str = "+33 7 88 85 72 97";
const DEFAULT_MEASUREMENT_ID: &str = "G-XXXXXXXXXX";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub site: SiteConfig,
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = StorageConfig {
            access_key_id: non_empty_var("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
            bucket: non_empty_var("AWS_S3_BUCKET"),
            region: non_empty_var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: non_empty_var("AWS_ENDPOINT"),
        };

        let email = EmailConfig {
            api_key: non_empty_var("MAILGUN_API_KEY"),
            domain: non_empty_var("MAILGUN_DOMAIN"),
            from_address: non_empty_var("MAILGUN_FROM_EMAIL")
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            api_base_url: non_empty_var("MAILGUN_URL")
                .unwrap_or_else(|| DEFAULT_MAILGUN_URL.to_string()),
        };

        let site = SiteConfig {
            public_url: non_empty_var("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            contact_email: non_empty_var("CONTACT_EMAIL")
                .unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string()),
            contact_phone: non_empty_var("CONTACT_PHONE")
                .unwrap_or_else(|| DEFAULT_CONTACT_PHONE.to_string()),
        };

        let analytics = AnalyticsConfig {
            measurement_id: non_empty_var("GA_MEASUREMENT_ID")
                .unwrap_or_else(|| DEFAULT_MEASUREMENT_ID.to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            email,
            site,
            analytics,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Object-storage settings for contact attachments.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
}

/// Resolved credentials; only present when all three S3 settings are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl StorageConfig {
    pub fn credentials(&self) -> Option<CloudCredentials> {
        Some(CloudCredentials {
            access_key_id: self.access_key_id.clone()?,
            secret_access_key: self.secret_access_key.clone()?,
            bucket: self.bucket.clone()?,
        })
    }

    pub fn is_cloud_configured(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn bucket_name(&self) -> &str {
        self.bucket.as_deref().unwrap_or(DEFAULT_BUCKET)
    }
}

/// Transactional e-mail API settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub domain: Option<String>,
    pub from_address: String,
    pub api_base_url: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.domain.is_some()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            domain: None,
            from_address: DEFAULT_FROM_EMAIL.to_string(),
            api_base_url: DEFAULT_MAILGUN_URL.to_string(),
        }
    }
}

/// Public-facing contact details rendered into e-mails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub public_url: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl SiteConfig {
    pub fn privacy_url(&self) -> String {
        format!("{}/privacy", self.public_url.trim_end_matches('/'))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_url: DEFAULT_SITE_URL.to_string(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            contact_phone: DEFAULT_CONTACT_PHONE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub measurement_id: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            measurement_id: DEFAULT_MEASUREMENT_ID.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
