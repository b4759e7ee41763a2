//! Application configuration
//!
//! Read from a TOML file, `$BOOKING_CONFIG` or
//! `<config dir>/booking-service/config.toml`. Every section and field has a
//! default, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{CheckoutConfig, SweeperConfig};
use crate::domain::slot::Category;
use crate::domain::sub_venue::SubVenue;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::DatabaseConfig;
use crate::infrastructure::payments::{HttpGatewayConfig, WebhookVerifier};

pub const CONFIG_ENV: &str = "BOOKING_CONFIG";
const APP_DIR: &str = "booking-service";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Default config location: `$BOOKING_CONFIG`, else the platform config dir.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub security: SecuritySection,
    pub payments: PaymentsSection,
    pub sweeper: SweeperSection,
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    /// Use the in-process store instead of a database. It starts with the
    /// `[catalog]` sub-venues and nothing else.
    pub in_memory: bool,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let db = DatabaseConfig::default();
        Self {
            url: db.url,
            in_memory: false,
            max_connections: db.max_connections,
            connect_timeout_secs: db.connect_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// tracing env-filter directive, e.g. `info` or `slot_booking=debug,info`
    pub level: String,
    /// `plain` or `json`
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub jwt_issuer: String,
}

impl Default for SecuritySection {
    fn default() -> Self {
        let jwt = JwtConfig::default();
        Self {
            jwt_secret: jwt.secret,
            jwt_expiration_hours: jwt.expiration_hours,
            jwt_issuer: jwt.issuer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsSection {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: u64,
    pub timeout_secs: u64,
    pub currency: String,
    /// Subunits per major unit (100 for INR paise)
    pub subunit_factor: u32,
    /// Must contain `{CHECKOUT_SESSION_ID}`
    pub success_url: String,
    pub cancel_url: String,
    /// Skip the gateway and mark bookings paid immediately (development only)
    pub bypass: bool,
}

impl Default for PaymentsSection {
    fn default() -> Self {
        let checkout = CheckoutConfig::default();
        Self {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            webhook_tolerance_secs: 300,
            timeout_secs: 15,
            currency: checkout.currency,
            subunit_factor: checkout.subunit_factor,
            success_url: checkout.success_url,
            cancel_url: checkout.cancel_url,
            bypass: checkout.payment_bypass,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperSection {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Pending bookings older than this are checked against the gateway
    pub stale_after_secs: u64,
}

impl Default for SweeperSection {
    fn default() -> Self {
        let sweeper = SweeperConfig::default();
        Self {
            enabled: true,
            interval_secs: sweeper.interval_secs,
            stale_after_secs: sweeper.stale_after_secs,
        }
    }
}

/// Sub-venues loaded into the in-process store at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub sub_venues: Vec<SubVenueSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubVenueSeed {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub categories: Vec<Category>,
}

impl SubVenueSeed {
    pub fn to_sub_venue(&self) -> SubVenue {
        SubVenue {
            id: self.id.clone(),
            venue_id: self.venue_id.clone(),
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            categories: self.categories.clone(),
            created_at: chrono::Utc::now(),
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payments.subunit_factor == 0 {
            return Err(ConfigError::Invalid(
                "payments.subunit_factor must be positive".to_string(),
            ));
        }
        if !self.payments.bypass {
            if self.payments.secret_key.is_empty() {
                return Err(ConfigError::Invalid(
                    "payments.secret_key is required unless payments.bypass is set".to_string(),
                ));
            }
            if self.payments.webhook_secret.is_empty() {
                return Err(ConfigError::Invalid(
                    "payments.webhook_secret is required unless payments.bypass is set"
                        .to_string(),
                ));
            }
        }
        if self.sweeper.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweeper.interval_secs must be positive".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for seed in &self.catalog.sub_venues {
            if seed.id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "catalog.sub_venues entries need an id".to_string(),
                ));
            }
            if !seen.insert(seed.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "catalog.sub_venues id {} is listed twice",
                    seed.id
                )));
            }
        }
        Ok(())
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            connect_timeout_secs: self.database.connect_timeout_secs,
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.security.jwt_secret.clone(),
            expiration_hours: self.security.jwt_expiration_hours,
            issuer: self.security.jwt_issuer.clone(),
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            currency: self.payments.currency.clone(),
            subunit_factor: self.payments.subunit_factor,
            success_url: self.payments.success_url.clone(),
            cancel_url: self.payments.cancel_url.clone(),
            payment_bypass: self.payments.bypass,
        }
    }

    pub fn gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            api_base: self.payments.api_base.clone(),
            secret_key: self.payments.secret_key.clone(),
            timeout_secs: self.payments.timeout_secs,
        }
    }

    pub fn webhook_verifier(&self) -> WebhookVerifier {
        WebhookVerifier::new(
            self.payments.webhook_secret.clone(),
            self.payments.webhook_tolerance_secs,
        )
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            interval_secs: self.sweeper.interval_secs,
            stale_after_secs: self.sweeper.stale_after_secs,
        }
    }
}
