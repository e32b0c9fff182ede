//! Card payments against invoices.
//!
//! A payment intent is created with the provider first and a PENDING payment
//! is stored for it. The payment is settled either by the client confirming
//! it or by the provider's `payment_intent.succeeded` webhook.

use std::collections::BTreeMap;

use medflow_database::{
    clinic_for_payment_intent, ClinicScope, InvoiceStatus, NewPayment, PaymentMethod,
    PaymentStatus, Tenancy,
};
use medflow_payments::{to_minor_units, PaymentGateway, PaymentIntentRequest, WebhookEvent};
use tracing::{info, warn};

use crate::error::{ClinicError, ClinicResult};
use crate::models::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, PaymentIntentResponse,
};

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const CHARGE_REFUNDED: &str = "charge.refunded";
pub const DISPUTE_CLOSED: &str = "charge.dispute.closed";

pub async fn create_payment_intent(
    scope: &ClinicScope,
    gateway: &dyn PaymentGateway,
    req: CreatePaymentRequest,
) -> ClinicResult<PaymentIntentResponse> {
    let invoice_id = req.invoice_id.trim();
    if invoice_id.is_empty() {
        return Err(ClinicError::bad_request("invoiceId required"));
    }

    let invoice = {
        let mut conn = scope.acquire().await?;
        scope
            .invoices()
            .find(&mut conn, invoice_id)
            .await?
            .ok_or(ClinicError::NotFound("Invoice"))?
    };

    let metadata = BTreeMap::from([
        ("invoiceId".to_string(), invoice.id.clone()),
        ("clinicId".to_string(), scope.clinic_id().to_string()),
    ]);
    let intent = gateway
        .create_payment_intent(PaymentIntentRequest {
            amount: to_minor_units(invoice.total),
            currency: gateway.currency().to_string(),
            metadata,
        })
        .await?;

    let mut conn = scope.acquire().await?;
    let payment = scope
        .payments()
        .insert(
            &mut conn,
            NewPayment {
                invoice_id: invoice.id.clone(),
                amount: invoice.total,
                payment_method: PaymentMethod::Stripe,
                stripe_payment_intent_id: Some(intent.id.clone()),
            },
        )
        .await?;

    info!(
        clinic_id = %scope.clinic_id(),
        invoice_id = %invoice.id,
        payment_id = %payment.id,
        payment_intent = %intent.id,
        "payment intent created"
    );

    Ok(PaymentIntentResponse {
        client_secret: intent.client_secret,
        payment,
    })
}

/// Client-side confirmation: the payment is completed and its invoice paid.
pub async fn confirm_payment(
    scope: &ClinicScope,
    req: ConfirmPaymentRequest,
) -> ClinicResult<ConfirmPaymentResponse> {
    let intent_id = req.payment_intent_id.trim();
    if intent_id.is_empty() {
        return Err(ClinicError::bad_request("paymentIntentId required"));
    }

    let mut tx = scope.begin().await?;
    let payment = scope
        .payments()
        .find_by_intent(&mut tx, intent_id)
        .await?
        .ok_or(ClinicError::NotFound("Payment"))?;

    scope
        .payments()
        .set_status(&mut tx, &payment.id, PaymentStatus::Completed)
        .await?;
    scope
        .invoices()
        .set_status(&mut tx, &payment.invoice_id, InvoiceStatus::Paid)
        .await?;
    tx.commit().await?;

    info!(clinic_id = %scope.clinic_id(), payment_id = %payment.id, "payment confirmed");
    Ok(ConfirmPaymentResponse {
        success: true,
        payment_id: payment.id,
        invoice_id: payment.invoice_id,
    })
}

/// What a verified webhook delivery led to.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The payment completed; the invoice now has `invoice_status`.
    Settled {
        payment_id: String,
        invoice_status: InvoiceStatus,
    },
    Refunded { payment_id: String },
    /// No payment is stored for the referenced intent.
    UnknownIntent,
    Ignored,
}

/// Invoice status after `paid` has been received against `total`.
pub fn settled_status(paid: f64, total: f64, current: InvoiceStatus) -> InvoiceStatus {
    if paid >= total {
        InvoiceStatus::Paid
    } else if paid > 0.0 {
        InvoiceStatus::PartiallyPaid
    } else {
        current
    }
}

/// Apply a verified provider event. The delivery carries no session, so the
/// clinic is resolved from the payment intent before anything is read.
pub async fn handle_webhook(tenancy: &Tenancy, event: &WebhookEvent) -> ClinicResult<WebhookOutcome> {
    let event_type = event.event_type.as_str();
    if !matches!(event_type, PAYMENT_SUCCEEDED | CHARGE_REFUNDED | DISPUTE_CLOSED) {
        info!(event_type, "ignoring webhook event");
        return Ok(WebhookOutcome::Ignored);
    }

    let Some(intent_id) = event.payment_intent_id() else {
        warn!(event_type, "webhook event without payment intent");
        return Ok(WebhookOutcome::Ignored);
    };

    let Some(clinic_id) = clinic_for_payment_intent(tenancy.pool(), intent_id).await? else {
        warn!(event_type, payment_intent = intent_id, "payment not found for intent");
        return Ok(WebhookOutcome::UnknownIntent);
    };
    let scope = tenancy.scope(clinic_id);

    let mut tx = scope.begin().await?;
    let Some(payment) = scope.payments().find_by_intent(&mut tx, intent_id).await? else {
        return Ok(WebhookOutcome::UnknownIntent);
    };

    let outcome = if event_type == PAYMENT_SUCCEEDED {
        scope
            .payments()
            .set_status(&mut tx, &payment.id, PaymentStatus::Completed)
            .await?;

        let invoice = scope
            .invoices()
            .find(&mut tx, &payment.invoice_id)
            .await?
            .ok_or(ClinicError::NotFound("Invoice"))?;
        let paid = scope
            .payments()
            .completed_total(&mut tx, &invoice.id)
            .await?;
        let status = settled_status(paid, invoice.total, invoice.status);
        scope.invoices().set_status(&mut tx, &invoice.id, status).await?;

        info!(
            clinic_id = %scope.clinic_id(),
            payment_id = %payment.id,
            invoice_id = %invoice.id,
            paid,
            status = %status,
            "payment settled"
        );
        WebhookOutcome::Settled {
            payment_id: payment.id,
            invoice_status: status,
        }
    } else {
        scope
            .payments()
            .set_status(&mut tx, &payment.id, PaymentStatus::Refunded)
            .await?;
        info!(clinic_id = %scope.clinic_id(), payment_id = %payment.id, event_type, "payment refunded");
        WebhookOutcome::Refunded {
            payment_id: payment.id,
        }
    };

    tx.commit().await?;
    Ok(outcome)
}
