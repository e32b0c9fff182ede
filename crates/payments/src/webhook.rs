//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! The signed payload is `"{t}.{raw body}"`, keyed with the endpoint secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use crate::PaymentError;
use medflow_config::PaymentsConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: Value,
}

impl WebhookEvent {
    /// The payment intent the event is about, if any. Intent events carry it
    /// as the object id; charge events reference it.
    pub fn payment_intent_id(&self) -> Option<&str> {
        let object = &self.data.object;
        match self.event_type.as_str() {
            t if t.starts_with("payment_intent.") => object.get("id").and_then(Value::as_str),
            _ => object.get("payment_intent").and_then(Value::as_str),
        }
    }
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    tolerance_seconds: i64,
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>, tolerance_seconds: u64) -> Self {
        Self {
            secret: secret.filter(|value| !value.trim().is_empty()),
            tolerance_seconds: i64::try_from(tolerance_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &PaymentsConfig) -> Self {
        Self::new(
            config.stripe_webhook_secret.clone(),
            config.webhook_tolerance_seconds,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, PaymentError> {
        self.verify_at(payload, signature_header, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<WebhookEvent, PaymentError> {
        let secret = self.secret.as_deref().ok_or(PaymentError::NotConfigured)?;

        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
        let issued_at: i64 = timestamp.parse().map_err(|_| PaymentError::InvalidSignature)?;
        if (now - issued_at).abs() > self.tolerance_seconds {
            debug!(issued_at, now, "webhook timestamp outside tolerance");
            return Err(PaymentError::InvalidSignature);
        }

        let matches = signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&expected).is_ok()
        });

        if !matches {
            return Err(PaymentError::InvalidSignature);
        }

        Ok(serde_json::from_slice(payload)?)
    }
}

/// Produce a header value the verifier accepts. Used by tests and local tooling.
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
