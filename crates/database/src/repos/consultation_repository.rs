//! Consultations of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now, optional_json_column};
use crate::entities::{Consultation, ConsultationChanges, ConsultationFilter, NewConsultation};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const CONSULTATION_SELECT: &str = "SELECT c.id, c.clinic_id, c.appointment_id, c.patient_id, c.doctor_id, \
     c.chief_complaint, c.diagnosis, c.notes, c.vital_signs, c.consultation_date, c.status, \
     c.created_at, c.updated_at, \
     pu.first_name || ' ' || pu.last_name AS patient_name, \
     du.first_name || ' ' || du.last_name AS doctor_name \
     FROM consultations c \
     JOIN patients p ON p.id = c.patient_id \
     JOIN users pu ON pu.id = p.user_id \
     JOIN doctors d ON d.id = c.doctor_id \
     JOIN users du ON du.id = d.user_id";

fn map_consultation(row: &SqliteRow) -> DatabaseResult<Consultation> {
    Ok(Consultation {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        appointment_id: row.try_get("appointment_id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        chief_complaint: row.try_get("chief_complaint")?,
        diagnosis: row.try_get("diagnosis")?,
        notes: row.try_get("notes")?,
        vital_signs: optional_json_column(row, "vital_signs")?,
        consultation_date: row.try_get("consultation_date")?,
        status: enum_column(row, "status")?,
        patient_name: row.try_get("patient_name")?,
        doctor_name: row.try_get("doctor_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct ConsultationRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> ConsultationRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &ConsultationFilter,
    ) -> DatabaseResult<Vec<Consultation>> {
        let status = filter.status.map(|status| status.as_str());
        let sql = format!(
            "{CONSULTATION_SELECT} WHERE c.clinic_id = ? \
             AND (? IS NULL OR c.patient_id = ?) AND (? IS NULL OR c.doctor_id = ?) \
             AND (? IS NULL OR c.status = ?) \
             ORDER BY c.consultation_date DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .bind(&filter.patient_id)
            .bind(&filter.patient_id)
            .bind(&filter.doctor_id)
            .bind(&filter.doctor_id)
            .bind(status)
            .bind(status)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_consultation).collect()
    }

    pub async fn find(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DatabaseResult<Option<Consultation>> {
        let sql = format!("{CONSULTATION_SELECT} WHERE c.id = ? AND c.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_consultation).transpose()
    }

    pub async fn exists_for_appointment(
        &self,
        conn: &mut SqliteConnection,
        appointment_id: &str,
    ) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM consultations WHERE appointment_id = ? AND clinic_id = ?",
        )
        .bind(appointment_id)
        .bind(self.clinic_id.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        consultation: NewConsultation,
    ) -> DatabaseResult<Consultation> {
        let id = new_id();
        let now = now();
        let vital_signs = consultation
            .vital_signs
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO consultations (id, clinic_id, appointment_id, patient_id, doctor_id, chief_complaint, \
             diagnosis, notes, vital_signs, consultation_date, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&consultation.appointment_id)
        .bind(&consultation.patient_id)
        .bind(&consultation.doctor_id)
        .bind(&consultation.chief_complaint)
        .bind(&consultation.diagnosis)
        .bind(&consultation.notes)
        .bind(vital_signs)
        .bind(&consultation.consultation_date)
        .bind(consultation.status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let sql = format!("{CONSULTATION_SELECT} WHERE c.id = ?");
        let row = sqlx::query(&sql).bind(&id).fetch_one(&mut *conn).await?;
        map_consultation(&row)
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: ConsultationChanges,
    ) -> DatabaseResult<Option<Consultation>> {
        let vital_signs = changes
            .vital_signs
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE consultations SET chief_complaint = COALESCE(?, chief_complaint), \
             diagnosis = COALESCE(?, diagnosis), notes = COALESCE(?, notes), \
             vital_signs = COALESCE(?, vital_signs), status = COALESCE(?, status), updated_at = ? \
             WHERE id = ? AND clinic_id = ?",
        )
        .bind(&changes.chief_complaint)
        .bind(&changes.diagnosis)
        .bind(&changes.notes)
        .bind(vital_signs)
        .bind(changes.status.map(|status| status.as_str()))
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

    /// Prescriptions written during the consultation go with it.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM consultations WHERE id = ? AND clinic_id = ?")
            .bind(id)
            .bind(self.clinic_id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
