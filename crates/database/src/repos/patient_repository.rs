//! Patients of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{new_id, now, optional_enum_column};
use crate::entities::{NewPatient, Patient, PatientChanges};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const PATIENT_SELECT: &str = "SELECT p.id, p.clinic_id, p.user_id, u.first_name, u.last_name, u.email, u.phone, \
     p.date_of_birth, p.gender, p.blood_type, p.address, p.emergency_contact, p.allergies, \
     p.chronic_conditions, p.created_at, p.updated_at \
     FROM patients p JOIN users u ON u.id = p.user_id";

fn map_patient(row: &SqliteRow) -> DatabaseResult<Patient> {
    Ok(Patient {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        user_id: row.try_get("user_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        date_of_birth: row.try_get("date_of_birth")?,
        gender: optional_enum_column(row, "gender")?,
        blood_type: row.try_get("blood_type")?,
        address: row.try_get("address")?,
        emergency_contact: row.try_get("emergency_contact")?,
        allergies: row.try_get("allergies")?,
        chronic_conditions: row.try_get("chronic_conditions")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PatientRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> PatientRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    /// Newest first.
    pub async fn list(&self, conn: &mut SqliteConnection) -> DatabaseResult<Vec<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE p.clinic_id = ? ORDER BY p.created_at DESC");
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_patient).collect()
    }

    pub async fn find(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE p.id = ? AND p.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_patient).transpose()
    }

    /// The patient record attached to a login, if that login is a patient here.
    pub async fn find_by_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> DatabaseResult<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE p.user_id = ? AND p.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_patient).transpose()
    }

    pub async fn exists(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE id = ? AND clinic_id = ?")
                .bind(id)
                .bind(self.clinic_id.as_str())
                .fetch_one(&mut *conn)
                .await?;
        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        patient: NewPatient,
    ) -> DatabaseResult<Patient> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO patients (id, clinic_id, user_id, date_of_birth, gender, blood_type, address, \
             emergency_contact, allergies, chronic_conditions, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&patient.user_id)
        .bind(&patient.date_of_birth)
        .bind(patient.gender.map(|gender| gender.as_str()))
        .bind(&patient.blood_type)
        .bind(&patient.address)
        .bind(&patient.emergency_contact)
        .bind(&patient.allergies)
        .bind(&patient.chronic_conditions)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let sql = format!("{PATIENT_SELECT} WHERE p.id = ? AND p.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(&id)
            .bind(self.clinic_id.as_str())
            .fetch_one(&mut *conn)
            .await?;

        map_patient(&row)
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: PatientChanges,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE patients SET date_of_birth = COALESCE(?, date_of_birth), gender = COALESCE(?, gender), \
             blood_type = COALESCE(?, blood_type), address = COALESCE(?, address), \
             emergency_contact = COALESCE(?, emergency_contact), allergies = COALESCE(?, allergies), \
             chronic_conditions = COALESCE(?, chronic_conditions), updated_at = ? \
             WHERE id = ? AND clinic_id = ?",
        )
        .bind(&changes.date_of_birth)
        .bind(changes.gender.map(|gender| gender.as_str()))
        .bind(&changes.blood_type)
        .bind(&changes.address)
        .bind(&changes.emergency_contact)
        .bind(&changes.allergies)
        .bind(&changes.chronic_conditions)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
