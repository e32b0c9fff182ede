//! Doctors of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{new_id, now};
use crate::entities::{Doctor, NewDoctor};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const DOCTOR_SELECT: &str = "SELECT d.id, d.clinic_id, d.user_id, u.first_name, u.last_name, u.email, \
     d.specialization, d.license_number, d.consultation_fee, d.biography, d.created_at \
     FROM doctors d JOIN users u ON u.id = d.user_id";

fn map_doctor(row: &SqliteRow) -> DatabaseResult<Doctor> {
    Ok(Doctor {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        user_id: row.try_get("user_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        specialization: row.try_get("specialization")?,
        license_number: row.try_get("license_number")?,
        consultation_fee: row.try_get("consultation_fee")?,
        biography: row.try_get("biography")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct DoctorRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> DoctorRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list(&self, conn: &mut SqliteConnection) -> DatabaseResult<Vec<Doctor>> {
        let sql = format!(
            "{DOCTOR_SELECT} WHERE d.clinic_id = ? AND u.is_active = 1 ORDER BY u.last_name, u.first_name"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_doctor).collect()
    }

    /// Accepts either the doctor record id or the id of the doctor's login.
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        reference: &str,
    ) -> DatabaseResult<Option<Doctor>> {
        let sql = format!("{DOCTOR_SELECT} WHERE (d.id = ? OR d.user_id = ?) AND d.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(reference)
            .bind(reference)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_doctor).transpose()
    }

    pub async fn find_by_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> DatabaseResult<Option<Doctor>> {
        let sql = format!("{DOCTOR_SELECT} WHERE d.user_id = ? AND d.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_doctor).transpose()
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, doctor: NewDoctor) -> DatabaseResult<Doctor> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO doctors (id, clinic_id, user_id, specialization, license_number, consultation_fee, \
             biography, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&doctor.user_id)
        .bind(&doctor.specialization)
        .bind(&doctor.license_number)
        .bind(doctor.consultation_fee)
        .bind(&doctor.biography)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let sql = format!("{DOCTOR_SELECT} WHERE d.id = ?");
        let row = sqlx::query(&sql).bind(&id).fetch_one(&mut *conn).await?;
        map_doctor(&row)
    }
}
