use std::sync::Mutex;

use async_trait::async_trait;
use medflow_clinic::models::{
    ConfirmPaymentRequest, CreateInvoiceRequest, CreatePatientRequest, CreatePaymentRequest,
    RegisterRequest,
};
use medflow_clinic::services::billing::{self, WebhookOutcome};
use medflow_clinic::services::{invoices, onboarding, patients};
use medflow_config::DatabaseConfig;
use medflow_database::{
    initialize_database, ClinicId, ClinicScope, InvoiceItem, InvoiceStatus, PaymentStatus, Tenancy,
};
use medflow_payments::{
    PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest, WebhookEvent,
};
use serde_json::json;
use tempfile::TempDir;

#[derive(Default)]
struct FakeGateway {
    requests: Mutex<Vec<PaymentIntentRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        let n = requests.len();
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret"),
        })
    }

    fn currency(&self) -> &str {
        "usd"
    }
}

struct Fixture {
    tenancy: Tenancy,
    scope: ClinicScope,
    invoice_id: String,
    _dir: TempDir,
}

async fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("billing.db").display()),
        max_connections: 5,
        rls_session_variable: false,
    };
    let tenancy = Tenancy::new(initialize_database(&config).await.unwrap(), false);

    let registered = onboarding::register(
        &tenancy,
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "ada@sunrise.test".into(),
            password: "password123".into(),
            phone: None,
            clinic_name: "Sunrise Clinic".into(),
        },
    )
    .await
    .unwrap();
    let scope = tenancy.scope(ClinicId::new(registered.clinic_id).unwrap());

    let patient = patients::create(
        &scope,
        CreatePatientRequest {
            first_name: "Pat".into(),
            last_name: "Ient".into(),
            email: "pat@sunrise.test".into(),
            phone: None,
            password: None,
            date_of_birth: None,
            gender: None,
            blood_type: None,
            address: None,
            emergency_contact: None,
            allergies: None,
            chronic_conditions: None,
        },
    )
    .await
    .unwrap();

    let invoice = invoices::create(
        &scope,
        CreateInvoiceRequest {
            patient_id: patient.id,
            items: vec![InvoiceItem {
                description: "Blood Test".into(),
                quantity: 2,
                unit_price: 50.0,
                service_id: None,
            }],
            tax: Some(20.0),
            notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(invoice.total, 120.0);

    Fixture {
        tenancy,
        scope,
        invoice_id: invoice.id,
        _dir: dir,
    }
}

fn event(event_type: &str, object: serde_json::Value) -> WebhookEvent {
    serde_json::from_value(json!({
        "id": "evt_1",
        "type": event_type,
        "data": { "object": object },
    }))
    .unwrap()
}

#[tokio::test]
async fn webhook_settles_and_refunds_payment() {
    let fx = setup().await;
    let gateway = FakeGateway::default();

    let intent = billing::create_payment_intent(
        &fx.scope,
        &gateway,
        CreatePaymentRequest {
            invoice_id: fx.invoice_id.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(intent.client_secret, "pi_test_1_secret");
    assert_eq!(intent.payment.status, PaymentStatus::Pending);

    {
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].amount, 12_000);
        assert_eq!(requests[0].metadata["invoiceId"], fx.invoice_id);
        assert_eq!(requests[0].metadata["clinicId"], fx.scope.clinic_id().to_string());
    }

    let outcome = billing::handle_webhook(
        &fx.tenancy,
        &event(billing::PAYMENT_SUCCEEDED, json!({ "id": "pi_test_1" })),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Settled {
            payment_id: intent.payment.id.clone(),
            invoice_status: InvoiceStatus::Paid,
        }
    );
    let invoice = invoices::get(&fx.scope, &fx.invoice_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.payments[0].status, PaymentStatus::Completed);

    let outcome = billing::handle_webhook(
        &fx.tenancy,
        &event(
            billing::CHARGE_REFUNDED,
            json!({ "id": "ch_1", "payment_intent": "pi_test_1" }),
        ),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Refunded {
            payment_id: intent.payment.id
        }
    );
    let invoice = invoices::get(&fx.scope, &fx.invoice_id).await.unwrap();
    assert_eq!(invoice.payments[0].status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn webhook_ignores_unrelated_events_and_unknown_intents() {
    let fx = setup().await;

    let outcome = billing::handle_webhook(
        &fx.tenancy,
        &event("customer.created", json!({ "id": "cus_1" })),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WebhookOutcome::Ignored);

    let outcome = billing::handle_webhook(
        &fx.tenancy,
        &event(billing::PAYMENT_SUCCEEDED, json!({ "id": "pi_missing" })),
    )
    .await
    .unwrap();
    assert_eq!(outcome, WebhookOutcome::UnknownIntent);
}

#[tokio::test]
async fn client_confirmation_marks_invoice_paid() {
    let fx = setup().await;
    let gateway = FakeGateway::default();

    billing::create_payment_intent(
        &fx.scope,
        &gateway,
        CreatePaymentRequest {
            invoice_id: fx.invoice_id.clone(),
        },
    )
    .await
    .unwrap();

    let confirmed = billing::confirm_payment(
        &fx.scope,
        ConfirmPaymentRequest {
            payment_intent_id: "pi_test_1".into(),
        },
    )
    .await
    .unwrap();
    assert!(confirmed.success);
    assert_eq!(confirmed.invoice_id, fx.invoice_id);

    let invoice = invoices::get(&fx.scope, &fx.invoice_id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}
