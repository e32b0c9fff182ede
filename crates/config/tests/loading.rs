//! Loading `medflow-config` from defaults, files and `MEDFLOW__*` overrides.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use medflow_config::{load, AppConfig, AuthConfig, HttpConfig, PaymentsConfig};

const MEDFLOW_VARS: &[&str] = &[
    "MEDFLOW_CONFIG",
    "MEDFLOW__AUTH__SESSION_TTL_SECONDS",
    "MEDFLOW__DATABASE__MAX_CONNECTIONS",
    "MEDFLOW__DATABASE__RLS_SESSION_VARIABLE",
    "MEDFLOW__DATABASE__URL",
    "MEDFLOW__EMAIL__FROM",
    "MEDFLOW__EMAIL__SENDGRID_API_KEY",
    "MEDFLOW__HTTP__ADDRESS",
    "MEDFLOW__HTTP__PORT",
    "MEDFLOW__HTTP__PUBLIC_URL",
    "MEDFLOW__PAYMENTS__STRIPE_SECRET_KEY",
    "MEDFLOW__PAYMENTS__STRIPE_WEBHOOK_SECRET",
    "MEDFLOW__STORAGE__ROOT",
];

/// Empty working directory with every `MEDFLOW` variable cleared. Both are
/// restored on drop.
struct Sandbox {
    dir: TempDir,
    saved_vars: Vec<(&'static str, Option<String>)>,
    saved_dir: PathBuf,
}

impl Sandbox {
    fn enter() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let saved_vars = MEDFLOW_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in MEDFLOW_VARS {
            std::env::remove_var(key);
        }
        let saved_dir = std::env::current_dir().expect("failed to capture current directory");
        std::env::set_current_dir(dir.path()).expect("failed to enter temp dir");

        Self {
            dir,
            saved_vars,
            saved_dir,
        }
    }

    fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create config directories");
        }
        fs::write(&path, contents).expect("failed to write config file");
        path
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.saved_dir);
        for (key, value) in &self.saved_vars {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let _sandbox = Sandbox::enter();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.http.public_url, defaults.http.public_url);
    assert!(!config.http.expose_internal_errors);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert!(!config.database.rls_session_variable);
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(config.storage.root, defaults.storage.root);
    assert_eq!(config.email.from, "noreply@medflow.com");
    assert!(config.email.sendgrid_api_key.is_none());
    assert!(config.payments.stripe_secret_key.is_none());
    assert!(config.payments.stripe_webhook_secret.is_none());
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let sandbox = Sandbox::enter();

    sandbox.write(
        "medflow.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    sandbox.write(
        "config/medflow.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let sandbox = Sandbox::enter();

    sandbox.write(
        "medflow.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50

        [payments]
        stripe_secret_key = "sk_test_123"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.payments.stripe_secret_key.as_deref(),
        Some("sk_test_123")
    );
    assert_eq!(config.payments.currency, defaults.payments.currency);
    assert_eq!(
        config.payments.webhook_tolerance_seconds,
        defaults.payments.webhook_tolerance_seconds
    );
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let sandbox = Sandbox::enter();

    let custom = sandbox.write(
        "elsewhere/custom.toml",
        r#"
        [storage]
        root = "/var/lib/medflow/files"
        "#,
    );
    std::env::set_var("MEDFLOW_CONFIG", &custom);

    let config = load().expect("configuration load should use MEDFLOW_CONFIG");
    assert_eq!(config.storage.root, "/var/lib/medflow/files");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let sandbox = Sandbox::enter();

    sandbox.write(
        "medflow.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    std::env::set_var("MEDFLOW__HTTP__PORT", "8080");
    std::env::set_var("MEDFLOW__PAYMENTS__STRIPE_WEBHOOK_SECRET", "whsec_test");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(
        config.payments.stripe_webhook_secret.as_deref(),
        Some("whsec_test")
    );
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let _sandbox = Sandbox::enter();

    let url = "sqlite:///var/lib/medflow/clinic.db";
    std::env::set_var("MEDFLOW__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let sandbox = Sandbox::enter();

    sandbox.write(
        "medflow.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_to_thirty_day_sessions() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.session_ttl_seconds, 30 * 24 * 60 * 60);
}

#[test]
fn payments_config_defaults_point_at_stripe() {
    let defaults = PaymentsConfig::default();
    assert_eq!(defaults.api_base, "https://api.stripe.com");
    assert_eq!(defaults.request_timeout_seconds, 30);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
