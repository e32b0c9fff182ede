//! Invoices of the current clinic, loaded together with their payments.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::payment_repository::{map_payment, PAYMENT_COLUMNS};
use super::{enum_column, json_column, new_id, now};
use crate::entities::{
    Invoice, InvoiceChanges, InvoiceFilter, InvoiceStatus, NewInvoice, Payment,
};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const INVOICE_SELECT: &str = "SELECT i.id, i.clinic_id, i.patient_id, i.invoice_number, i.items, \
     i.subtotal, i.tax, i.total, i.status, i.notes, i.created_at, i.updated_at, \
     u.first_name || ' ' || u.last_name AS patient_name \
     FROM invoices i \
     JOIN patients p ON p.id = i.patient_id \
     JOIN users u ON u.id = p.user_id";

fn map_invoice(row: &SqliteRow, payments: Vec<Payment>) -> DatabaseResult<Invoice> {
    Ok(Invoice {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        patient_id: row.try_get("patient_id")?,
        patient_name: row.try_get("patient_name")?,
        invoice_number: row.try_get("invoice_number")?,
        items: json_column(row, "items")?,
        subtotal: row.try_get("subtotal")?,
        tax: row.try_get("tax")?,
        total: row.try_get("total")?,
        status: enum_column(row, "status")?,
        notes: row.try_get("notes")?,
        payments,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct InvoiceRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> InvoiceRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    /// Newest first.
    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &InvoiceFilter,
    ) -> DatabaseResult<Vec<Invoice>> {
        let sql = format!(
            "{INVOICE_SELECT} WHERE i.clinic_id = ? AND (? IS NULL OR i.patient_id = ?) \
             ORDER BY i.created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .bind(&filter.patient_id)
            .bind(&filter.patient_id)
            .fetch_all(&mut *conn)
            .await?;

        let payment_sql =
            format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE clinic_id = ? ORDER BY created_at");
        let payment_rows = sqlx::query(&payment_sql)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;
        let mut payments = payment_rows
            .iter()
            .map(map_payment)
            .collect::<DatabaseResult<Vec<_>>>()?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let (own, rest): (Vec<_>, Vec<_>) =
                payments.into_iter().partition(|payment| payment.invoice_id == id);
            payments = rest;
            invoices.push(map_invoice(row, own)?);
        }
        Ok(invoices)
    }

    pub async fn find(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<Option<Invoice>> {
        let sql = format!("{INVOICE_SELECT} WHERE i.id = ? AND i.clinic_id = ?");
        let Some(row) = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let payments = super::PaymentRepository::new(self.clinic_id)
            .list_for_invoice(conn, id)
            .await?;
        map_invoice(&row, payments).map(Some)
    }

    /// Number of invoices ever issued by the clinic.
    pub async fn count(&self, conn: &mut SqliteConnection) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE clinic_id = ?")
            .bind(self.clinic_id.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, invoice: NewInvoice) -> DatabaseResult<Invoice> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO invoices (id, clinic_id, patient_id, invoice_number, items, subtotal, tax, total, \
             status, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&invoice.patient_id)
        .bind(&invoice.invoice_number)
        .bind(serde_json::to_string(&invoice.items)?)
        .bind(invoice.subtotal)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(InvoiceStatus::Pending.as_str())
        .bind(&invoice.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let sql = format!("{INVOICE_SELECT} WHERE i.id = ?");
        let row = sqlx::query(&sql).bind(&id).fetch_one(&mut *conn).await?;
        map_invoice(&row, Vec::new())
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: InvoiceChanges,
    ) -> DatabaseResult<Option<Invoice>> {
        let result = sqlx::query(
            "UPDATE invoices SET status = COALESCE(?, status), notes = COALESCE(?, notes), updated_at = ? \
             WHERE id = ? AND clinic_id = ?",
        )
        .bind(changes.status.map(|status| status.as_str()))
        .bind(&changes.notes)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(conn, id).await
    }

    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        status: InvoiceStatus,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE invoices SET status = ?, updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(status.as_str())
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
