use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "medflow.toml",
    "config/medflow.toml",
    "crates/config/medflow.toml",
    "../medflow.toml",
    "../config/medflow.toml",
    "../crates/config/medflow.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Base URL of the web application, used when building links in emails.
    #[serde(default = "HttpConfig::default_public_url")]
    pub public_url: String,
    /// When false, 500 responses carry a generic message instead of the cause.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

impl HttpConfig {
    fn default_public_url() -> String {
        "http://localhost:3000".to_string()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
            public_url: Self::default_public_url(),
            expose_internal_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Set the `medflow.current_clinic` session variable inside scoped transactions.
    /// Inert on SQLite, which has no `set_config`: the first attempt logs a warning
    /// and tenant isolation rests on the scoped queries alone.
    #[serde(default)]
    pub rls_session_variable: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://medflow.db".to_string(),
            max_connections: 10,
            rls_session_variable: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
        }
    }
}

impl AuthConfig {
    /// Thirty days.
    fn default_session_ttl() -> u64 {
        2_592_000
    }
}

/// Where generated documents such as prescription PDFs are written.
///
/// ```
/// use medflow_config::StorageConfig;
///
/// let storage = StorageConfig::default();
/// assert_eq!(storage.root, "uploads");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_root")]
    pub root: String,
}

impl StorageConfig {
    fn default_root() -> String {
        "uploads".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
        }
    }
}

/// Outbound email settings. Without an API key mail is logged and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub sendgrid_api_key: Option<String>,
    #[serde(default = "EmailConfig::default_from")]
    pub from: String,
    #[serde(default = "EmailConfig::default_api_base")]
    pub api_base: String,
}

impl EmailConfig {
    fn default_from() -> String {
        "noreply@medflow.com".to_string()
    }

    fn default_api_base() -> String {
        "https://api.sendgrid.com".to_string()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sendgrid_api_key: None,
            from: Self::default_from(),
            api_base: Self::default_api_base(),
        }
    }
}

/// Stripe credentials and webhook verification settings.
///
/// ```
/// use medflow_config::PaymentsConfig;
///
/// let payments = PaymentsConfig::default();
/// assert_eq!(payments.api_base, "https://api.stripe.com");
/// assert_eq!(payments.currency, "usd");
/// assert_eq!(payments.webhook_tolerance_seconds, 300);
/// assert!(payments.stripe_secret_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,
    #[serde(default = "PaymentsConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "PaymentsConfig::default_currency")]
    pub currency: String,
    #[serde(default = "PaymentsConfig::default_webhook_tolerance")]
    pub webhook_tolerance_seconds: u64,
    #[serde(default = "PaymentsConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl PaymentsConfig {
    fn default_api_base() -> String {
        "https://api.stripe.com".to_string()
    }

    fn default_currency() -> String {
        "usd".to_string()
    }

    const fn default_webhook_tolerance() -> u64 {
        300
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            api_base: Self::default_api_base(),
            currency: Self::default_currency(),
            webhook_tolerance_seconds: Self::default_webhook_tolerance(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use medflow_config::load;
///
/// std::env::remove_var("MEDFLOW_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("http.public_url", defaults.http.public_url.clone())?
        .set_default("http.expose_internal_errors", defaults.http.expose_internal_errors)?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "database.rls_session_variable",
            defaults.database.rls_session_variable,
        )?
        .set_default(
            "auth.session_ttl_seconds",
            clamp_to_i64(defaults.auth.session_ttl_seconds),
        )?
        .set_default("storage.root", defaults.storage.root.clone())?
        .set_default("email.from", defaults.email.from.clone())?
        .set_default("email.api_base", defaults.email.api_base.clone())?
        .set_default("payments.api_base", defaults.payments.api_base.clone())?
        .set_default("payments.currency", defaults.payments.currency.clone())?
        .set_default(
            "payments.webhook_tolerance_seconds",
            clamp_to_i64(defaults.payments.webhook_tolerance_seconds),
        )?
        .set_default(
            "payments.request_timeout_seconds",
            clamp_to_i64(defaults.payments.request_timeout_seconds),
        )?;

    let environment_overrides = config::Environment::with_prefix("MEDFLOW").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("MEDFLOW_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via MEDFLOW_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    debug!(
        http = ?config.http,
        database = ?config.database,
        storage = ?config.storage,
        email_enabled = config.email.sendgrid_api_key.is_some(),
        payments_enabled = config.payments.stripe_secret_key.is_some(),
        "loaded backend configuration"
    );
    Ok(config)
}
