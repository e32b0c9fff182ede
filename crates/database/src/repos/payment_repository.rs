//! Payments recorded against invoices of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now};
use crate::entities::{NewPayment, Payment, PaymentStatus};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

pub(crate) const PAYMENT_COLUMNS: &str = "id, clinic_id, invoice_id, amount, payment_method, status, \
     stripe_payment_intent_id, paid_at, created_at, updated_at";

pub(crate) fn map_payment(row: &SqliteRow) -> DatabaseResult<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        invoice_id: row.try_get("invoice_id")?,
        amount: row.try_get("amount")?,
        payment_method: enum_column(row, "payment_method")?,
        status: enum_column(row, "status")?,
        stripe_payment_intent_id: row.try_get("stripe_payment_intent_id")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PaymentRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> PaymentRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list_for_invoice(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DatabaseResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ? AND clinic_id = ? \
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(invoice_id)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_payment).collect()
    }

    pub async fn find_by_intent(
        &self,
        conn: &mut SqliteConnection,
        payment_intent_id: &str,
    ) -> DatabaseResult<Option<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE stripe_payment_intent_id = ? AND clinic_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(payment_intent_id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_payment).transpose()
    }

    /// New payments start out pending.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        payment: NewPayment,
    ) -> DatabaseResult<Payment> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO payments (id, clinic_id, invoice_id, amount, payment_method, status, \
             stripe_payment_intent_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.payment_method.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(&payment.stripe_payment_intent_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(Payment {
            id,
            clinic_id: self.clinic_id.to_string(),
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            status: PaymentStatus::Pending,
            stripe_payment_intent_id: payment.stripe_payment_intent_id,
            paid_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Moves the payment to `status`. Completing a payment stamps `paid_at`.
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: PaymentStatus,
    ) -> DatabaseResult<Option<Payment>> {
        let now = now();
        let paid_at = (status == PaymentStatus::Completed).then(|| now.clone());

        let result = sqlx::query(
            "UPDATE payments SET status = ?, paid_at = COALESCE(?, paid_at), updated_at = ? \
             WHERE id = ? AND clinic_id = ?",
        )
        .bind(status.as_str())
        .bind(paid_at)
        .bind(&now)
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ? AND clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_one(&mut *conn)
            .await?;
        map_payment(&row).map(Some)
    }

    /// Sum of completed payments on an invoice.
    pub async fn completed_total(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
    ) -> DatabaseResult<f64> {
        let total: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM payments WHERE invoice_id = ? AND clinic_id = ? AND status = 'COMPLETED'",
        )
        .bind(invoice_id)
        .bind(self.clinic_id.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(total.unwrap_or(0.0))
    }
}
