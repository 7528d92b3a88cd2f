use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing_subscriber::EnvFilter;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// M-Pesa (Daraja) integration settings.
///
/// Defaults target the public Safaricom sandbox. Consumer key/secret may be
/// configured here as a fallback; the checkout request can carry its own
/// credentials, which take precedence.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MpesaSettings {
    #[serde(default = "default_mpesa_base_url")]
    pub base_url: String,

    /// Business shortcode used as both `PartyB` and the password seed.
    #[serde(default = "default_mpesa_shortcode")]
    pub shortcode: String,

    /// Passkey for STK password derivation.
    #[serde(default = "default_mpesa_passkey")]
    pub passkey: String,

    /// Must be publicly reachable for the provider's out-of-band callback.
    #[serde(default = "default_mpesa_callback_url")]
    pub callback_url: String,

    #[serde(default = "default_account_reference")]
    pub account_reference: String,

    /// National trunk prefix replacement for phone normalization.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Till number quoted in manual-payment instructions.
    #[serde(default = "default_till_number")]
    pub till_number: String,

    /// Hard cap on provider round trips; a slow provider must not hold the
    /// submitting request open indefinitely.
    #[serde(default = "default_mpesa_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
}

impl Default for MpesaSettings {
    fn default() -> Self {
        Self {
            base_url: default_mpesa_base_url(),
            shortcode: default_mpesa_shortcode(),
            passkey: default_mpesa_passkey(),
            callback_url: default_mpesa_callback_url(),
            account_reference: default_account_reference(),
            country_code: default_country_code(),
            till_number: default_till_number(),
            timeout_secs: default_mpesa_timeout_secs(),
            consumer_key: None,
            consumer_secret: None,
        }
    }
}

fn default_mpesa_base_url() -> String {
    "https://sandbox.safaricom.co.ke".to_string()
}
fn default_mpesa_shortcode() -> String {
    "174379".to_string()
}
fn default_mpesa_passkey() -> String {
    // Published Safaricom sandbox passkey, not a secret.
    "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919".to_string()
}
fn default_mpesa_callback_url() -> String {
    "https://example.invalid/api/callback".to_string()
}
fn default_account_reference() -> String {
    "PCnC Restaurant".to_string()
}
fn default_country_code() -> String {
    "254".to_string()
}
fn default_till_number() -> String {
    "6994591".to_string()
}
fn default_mpesa_timeout_secs() -> u64 {
    30
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (SQLite or Postgres).
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_env")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging).
    #[serde(default)]
    pub log_json: bool,

    /// Create missing tables on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Static bearer key gating the /api/admin routes. The full admin
    /// auth/session subsystem lives outside this core.
    #[validate(length(min = 16, message = "admin_api_key must be at least 16 characters"))]
    pub admin_api_key: String,

    /// Comma-separated allowed CORS origins; unset means permissive
    /// (the storefront is typically served from the same host).
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    #[validate]
    pub mpesa: MpesaSettings,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_env() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Loads configuration from `config/default.toml`, an optional
/// `config/{environment}.toml` overlay, and `APP__`-prefixed environment
/// variables (e.g. `APP__MPESA__SHORTCODE`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    Ok(cfg)
}

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pcnc_api={log_level},tower_http=info")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
