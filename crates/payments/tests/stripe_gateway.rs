//! Stripe client behaviour against a mocked API.

use std::collections::BTreeMap;

use httpmock::prelude::*;
use medflow_config::PaymentsConfig;
use medflow_payments::{PaymentError, PaymentGateway, PaymentIntentRequest, StripeGateway};

fn config_for(server: &MockServer) -> PaymentsConfig {
    PaymentsConfig {
        stripe_secret_key: Some("sk_test_123".into()),
        api_base: server.base_url(),
        request_timeout_seconds: 5,
        ..PaymentsConfig::default()
    }
}

fn request() -> PaymentIntentRequest {
    let mut metadata = BTreeMap::new();
    metadata.insert("invoiceId".to_string(), "inv_1".to_string());
    PaymentIntentRequest {
        amount: 15_000,
        currency: "USD".into(),
        metadata,
    }
}

#[tokio::test]
async fn create_payment_intent_posts_form_with_bearer_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/payment_intents")
                .header("authorization", "Bearer sk_test_123")
                .body_contains("amount=15000")
                .body_contains("currency=usd")
                .body_contains("metadata%5BinvoiceId%5D=inv_1");
            then.status(200).json_body(serde_json::json!({
                "id": "pi_123",
                "client_secret": "pi_123_secret_abc",
                "status": "requires_payment_method"
            }));
        })
        .await;

    let gateway = StripeGateway::new(&config_for(&server), "sk_test_123").unwrap();
    let intent = gateway.create_payment_intent(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(intent.id, "pi_123");
    assert_eq!(intent.client_secret, "pi_123_secret_abc");
}

#[tokio::test]
async fn provider_errors_surface_stripe_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/payment_intents");
            then.status(402).json_body(serde_json::json!({
                "error": { "message": "Amount must be at least $0.50 usd" }
            }));
        })
        .await;

    let gateway = StripeGateway::new(&config_for(&server), "sk_test_123").unwrap();
    let err = gateway
        .create_payment_intent(request())
        .await
        .expect_err("stripe error should propagate");

    match err {
        PaymentError::Provider { status, message } => {
            assert_eq!(status, 402);
            assert!(message.contains("at least"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
