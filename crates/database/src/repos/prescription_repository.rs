//! Prescriptions of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{json_column, new_id, now};
use crate::entities::{NewPrescription, Prescription, PrescriptionChanges, PrescriptionFilter};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const PRESCRIPTION_COLUMNS: &str = "id, clinic_id, consultation_id, patient_id, doctor_id, medications, \
     instructions, pdf_key, prescription_date, created_at, updated_at";

fn map_prescription(row: &SqliteRow) -> DatabaseResult<Prescription> {
    Ok(Prescription {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        consultation_id: row.try_get("consultation_id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        medications: json_column(row, "medications")?,
        instructions: row.try_get("instructions")?,
        pdf_key: row.try_get("pdf_key")?,
        prescription_date: row.try_get("prescription_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PrescriptionRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> PrescriptionRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &PrescriptionFilter,
    ) -> DatabaseResult<Vec<Prescription>> {
        let sql = format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE clinic_id = ? \
             AND (? IS NULL OR patient_id = ?) AND (? IS NULL OR doctor_id = ?) \
             ORDER BY prescription_date DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .bind(&filter.patient_id)
            .bind(&filter.patient_id)
            .bind(&filter.doctor_id)
            .bind(&filter.doctor_id)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_prescription).collect()
    }

    pub async fn list_for_consultation(
        &self,
        conn: &mut SqliteConnection,
        consultation_id: &str,
    ) -> DatabaseResult<Vec<Prescription>> {
        let sql = format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions \
             WHERE consultation_id = ? AND clinic_id = ? ORDER BY prescription_date"
        );
        let rows = sqlx::query(&sql)
            .bind(consultation_id)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_prescription).collect()
    }

    pub async fn find(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DatabaseResult<Option<Prescription>> {
        let sql = format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ? AND clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_prescription).transpose()
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        prescription: NewPrescription,
    ) -> DatabaseResult<Prescription> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO prescriptions (id, clinic_id, consultation_id, patient_id, doctor_id, medications, \
             instructions, prescription_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&prescription.consultation_id)
        .bind(&prescription.patient_id)
        .bind(&prescription.doctor_id)
        .bind(serde_json::to_string(&prescription.medications)?)
        .bind(&prescription.instructions)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(Prescription {
            id,
            clinic_id: self.clinic_id.to_string(),
            consultation_id: prescription.consultation_id,
            patient_id: prescription.patient_id,
            doctor_id: prescription.doctor_id,
            medications: prescription.medications,
            instructions: prescription.instructions,
            pdf_key: None,
            prescription_date: now.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: PrescriptionChanges,
    ) -> DatabaseResult<Option<Prescription>> {
        let medications = changes
            .medications
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE prescriptions SET medications = COALESCE(?, medications), \
             instructions = COALESCE(?, instructions), updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(medications)
        .bind(&changes.instructions)
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

    pub async fn set_pdf_key(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        key: &str,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE prescriptions SET pdf_key = ?, updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(key)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = ? AND clinic_id = ?")
            .bind(id)
            .bind(self.clinic_id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
