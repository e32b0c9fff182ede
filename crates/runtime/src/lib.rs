use anyhow::{Context, Result};
use medflow_auth::Authenticator;
use medflow_clinic::{mailer_from_config, store_from_config, SharedMailer, SharedStore};
use medflow_config::AppConfig;
use medflow_database::{initialize_database, Tenancy};
use medflow_payments::{gateway_from_config, SharedGateway, WebhookVerifier};
use sqlx::SqlitePool;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global fmt subscriber; `RUST_LOG` overrides the `info` default.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub tenancy: Tenancy,
    pub authenticator: Authenticator,
    pub mailer: SharedMailer,
    pub store: SharedStore,
    pub payments: SharedGateway,
    pub webhooks: WebhookVerifier,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let tenancy = Tenancy::new(db_pool.clone(), config.database.rls_session_variable);
        let authenticator = Authenticator::new(db_pool.clone(), &config.auth);

        let mailer = mailer_from_config(&config.email).context("failed to build mailer")?;
        let store = store_from_config(&config.storage);
        let payments =
            gateway_from_config(&config.payments).context("failed to build payment gateway")?;

        let webhooks = WebhookVerifier::from_config(&config.payments);
        if !webhooks.is_configured() {
            warn!("stripe webhook secret not configured; webhook deliveries will be rejected");
        }

        info!(
            storage_root = %config.storage.root,
            currency = %config.payments.currency,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            tenancy,
            authenticator,
            mailer,
            store,
            payments,
            webhooks,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
