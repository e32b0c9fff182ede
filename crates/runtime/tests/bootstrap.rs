use std::path::Path;

use anyhow::{Context, Result};
use medflow_config::AppConfig;
use medflow_payments::{PaymentError, PaymentIntentRequest};
use medflow_runtime::BackendServices;
use tempfile::TempDir;

fn build_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", root.join("runtime/medflow.db").display());
    config.database.max_connections = 2;
    config.storage.root = root.join("objects").display().to_string();
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(temp_dir.path());

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    for table in ["clinics", "users", "appointments", "invoices", "payments"] {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(&services.db_pool)
        .await?;
        assert_eq!(found.as_deref(), Some(table));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_provider_keys_fall_back_to_inert_services() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(temp_dir.path());
    let services = BackendServices::initialise(&config).await?;

    assert!(!services.webhooks.is_configured());

    let result = services
        .payments
        .create_payment_intent(PaymentIntentRequest {
            amount: 1_000,
            currency: "usd".into(),
            metadata: Default::default(),
        })
        .await;
    assert!(matches!(result, Err(PaymentError::NotConfigured)));

    services.store.put("probe/hello.txt", b"hi".to_vec().into(), "text/plain").await?;
    let stored = services.store.get("probe/hello.txt").await?;
    assert_eq!(stored.as_deref(), Some(&b"hi"[..]));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_reports_unreachable_database() {
    let mut config = AppConfig::default();
    config.database.url = "postgres://nowhere".into();

    let error = BackendServices::initialise(&config)
        .await
        .err()
        .expect("bootstrap must fail");
    assert!(format!("{error:#}").contains("database"));
}
