use medflow_database::{
    ClinicId, ClinicScope, Invoice, InvoiceChanges, InvoiceFilter, InvoiceStatus, NewInvoice,
};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreateInvoiceRequest, UpdateInvoiceRequest};
use crate::validation::{non_blank, Validator};

/// `INV-<first six characters of the clinic id, upper-cased>-<sequence, five digits>`.
pub fn invoice_number(clinic_id: &ClinicId, sequence: i64) -> String {
    let prefix: String = clinic_id.as_str().chars().take(6).collect();
    format!("INV-{}-{sequence:05}", prefix.to_uppercase())
}

pub async fn list(scope: &ClinicScope) -> ClinicResult<Vec<Invoice>> {
    let mut conn = scope.acquire().await?;
    Ok(scope
        .invoices()
        .list(&mut conn, &InvoiceFilter::default())
        .await?)
}

pub async fn get(scope: &ClinicScope, id: &str) -> ClinicResult<Invoice> {
    let mut conn = scope.acquire().await?;
    scope
        .invoices()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Invoice"))
}

/// Totals are computed here from the line items; the client's figures are not trusted.
pub async fn create(scope: &ClinicScope, req: CreateInvoiceRequest) -> ClinicResult<Invoice> {
    let tax = req.tax.unwrap_or(0.0);

    let mut v = Validator::new();
    v.required("patientId", &req.patient_id)
        .check("items", !req.items.is_empty(), "At least one item is required")
        .check("tax", tax.is_finite() && tax >= 0.0, "tax must not be negative");
    for (index, item) in req.items.iter().enumerate() {
        v.check(
            &format!("items.{index}.quantity"),
            item.quantity >= 1,
            "quantity must be at least 1",
        )
        .check(
            &format!("items.{index}.unitPrice"),
            item.unit_price.is_finite() && item.unit_price >= 0.0,
            "unitPrice must not be negative",
        );
    }
    v.finish()?;

    let subtotal: f64 = req.items.iter().map(|item| item.line_total()).sum();
    let total = subtotal + tax;

    let mut tx = scope.begin().await?;
    if !scope.patients().exists(&mut tx, &req.patient_id).await? {
        return Err(ClinicError::bad_request("Patient not found"));
    }

    let sequence = scope.invoices().count(&mut tx).await? + 1;
    let number = invoice_number(scope.clinic_id(), sequence);

    let invoice = scope
        .invoices()
        .insert(
            &mut tx,
            NewInvoice {
                patient_id: req.patient_id,
                invoice_number: number,
                items: req.items,
                subtotal,
                tax,
                total,
                notes: non_blank(req.notes),
            },
        )
        .await?;
    tx.commit().await?;

    info!(
        clinic_id = %scope.clinic_id(),
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        total,
        "invoice created"
    );
    Ok(invoice)
}

pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdateInvoiceRequest,
) -> ClinicResult<Invoice> {
    let mut v = Validator::new();
    let status: Option<InvoiceStatus> = v.parse("status", non_blank(req.status).as_deref());
    v.finish()?;

    let mut conn = scope.acquire().await?;
    let invoice = scope
        .invoices()
        .update(
            &mut conn,
            id,
            InvoiceChanges {
                status,
                notes: req.notes,
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Invoice"))?;

    info!(clinic_id = %scope.clinic_id(), invoice_id = %id, status = %invoice.status, "invoice updated");
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_test_db, seed_clinic, TestClinic};
    use medflow_database::InvoiceItem;

    fn invoice_request(clinic: &TestClinic) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            patient_id: clinic.patient_id.clone(),
            items: vec![
                InvoiceItem {
                    description: "Consultation".into(),
                    quantity: 1,
                    unit_price: 100.0,
                    service_id: None,
                },
                InvoiceItem {
                    description: "Blood test".into(),
                    quantity: 2,
                    unit_price: 25.0,
                    service_id: None,
                },
            ],
            tax: Some(15.0),
            notes: None,
        }
    }

    #[test]
    fn invoice_number_format() {
        let clinic = ClinicId::new("clx9abcdef").unwrap();
        assert_eq!(invoice_number(&clinic, 1), "INV-CLX9AB-00001");
        assert_eq!(invoice_number(&clinic, 123), "INV-CLX9AB-00123");
        assert_eq!(invoice_number(&ClinicId::new("ab").unwrap(), 7), "INV-AB-00007");
    }

    #[tokio::test]
    async fn totals_are_computed_and_numbers_increment() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;

        let first = create(&clinic.scope, invoice_request(&clinic)).await.unwrap();
        assert_eq!(first.subtotal, 150.0);
        assert_eq!(first.total, 165.0);
        assert_eq!(first.status, InvoiceStatus::Pending);
        assert!(first.invoice_number.ends_with("-00001"));

        let second = create(&clinic.scope, invoice_request(&clinic)).await.unwrap();
        assert!(second.invoice_number.ends_with("-00002"));
    }

    #[tokio::test]
    async fn numbering_is_per_clinic() {
        let (tenancy, _dir) = create_test_db().await;
        let north = seed_clinic(&tenancy, "North").await;
        let south = seed_clinic(&tenancy, "South").await;

        create(&north.scope, invoice_request(&north)).await.unwrap();
        create(&north.scope, invoice_request(&north)).await.unwrap();
        let south_first = create(&south.scope, invoice_request(&south)).await.unwrap();
        assert!(south_first.invoice_number.ends_with("-00001"));
        assert_eq!(list(&south.scope).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_items_are_rejected() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;

        let mut req = invoice_request(&clinic);
        req.items[0].quantity = 0;
        let Err(ClinicError::Validation(details)) = create(&clinic.scope, req).await else {
            panic!("expected validation error");
        };
        assert!(details.contains_key("items.0.quantity"));

        let mut req = invoice_request(&clinic);
        req.items.clear();
        assert!(create(&clinic.scope, req).await.is_err());
    }

    #[tokio::test]
    async fn update_changes_status_and_notes() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;
        let invoice = create(&clinic.scope, invoice_request(&clinic)).await.unwrap();

        let updated = update(
            &clinic.scope,
            &invoice.id,
            UpdateInvoiceRequest {
                status: Some("overdue".into()),
                notes: Some("Reminder sent".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.status, InvoiceStatus::Overdue);
        assert_eq!(updated.notes.as_deref(), Some("Reminder sent"));

        assert!(matches!(
            update(&clinic.scope, "missing", UpdateInvoiceRequest::default()).await,
            Err(ClinicError::NotFound("Invoice"))
        ));
    }
}
