//! Payment gateway integration.
//!
//! Only the two operations the billing flow needs are modelled: creating a
//! payment intent and verifying webhook deliveries.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use medflow_config::PaymentsConfig;

pub mod webhook;

pub use webhook::{WebhookEvent, WebhookVerifier};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payments are not configured")]
    NotConfigured,
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider rejected the request ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

/// A payment intent as far as the client needs to know it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    /// Smallest currency unit.
    pub amount: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    fn currency(&self) -> &str;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;

/// Build the gateway described by `config`: Stripe when a secret key is set,
/// otherwise one that refuses every request.
pub fn gateway_from_config(config: &PaymentsConfig) -> Result<SharedGateway, PaymentError> {
    match config.stripe_secret_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(Arc::new(StripeGateway::new(config, key)?)),
        _ => {
            warn!("stripe secret key missing; card payments are disabled");
            Ok(Arc::new(DisabledGateway::new(&config.currency)))
        }
    }
}

#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    api_base: String,
    secret_key: String,
    currency: String,
}

impl StripeGateway {
    pub fn new(config: &PaymentsConfig, secret_key: &str) -> Result<Self, PaymentError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("medflow-backend")
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            currency: config.currency.clone(),
        })
    }
}

#[derive(Deserialize)]
struct StripeIntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), request.amount.to_string()),
            ("currency".into(), request.currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        form.extend(
            request
                .metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value)),
        );

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let intent: StripeIntentResponse = response.json().await?;
        debug!(intent = %intent.id, amount = request.amount, "created stripe payment intent");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

/// Stand-in used when no Stripe key is configured.
#[derive(Debug, Clone)]
pub struct DisabledGateway {
    currency: String,
}

impl DisabledGateway {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_payment_intent(
        &self,
        _request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    fn currency(&self) -> &str {
        &self.currency
    }
}

/// Convert a decimal amount to the smallest currency unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_round_to_nearest_cent() {
        assert_eq!(to_minor_units(150.0), 15_000);
        assert_eq!(to_minor_units(19.995), 2_000);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
    }

    #[test]
    fn missing_key_yields_disabled_gateway() {
        let gateway = gateway_from_config(&PaymentsConfig::default()).unwrap();
        assert_eq!(gateway.currency(), "usd");
    }

    #[tokio::test]
    async fn disabled_gateway_refuses_requests() {
        let gateway = DisabledGateway::new("usd");
        let result = gateway
            .create_payment_intent(PaymentIntentRequest {
                amount: 100,
                currency: "usd".into(),
                metadata: BTreeMap::new(),
            })
            .await;
        assert!(matches!(result, Err(PaymentError::NotConfigured)));
    }
}
