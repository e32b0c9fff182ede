//! The clinic record of the current scope.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{json_column, now};
use crate::entities::{Clinic, ClinicChanges};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

pub struct ClinicRepository<'s> {
    clinic_id: &'s ClinicId,
}

fn map_clinic(row: &SqliteRow) -> DatabaseResult<Clinic> {
    Ok(Clinic {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        logo: row.try_get("logo")?,
        description: row.try_get("description")?,
        settings: json_column(row, "settings")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl<'s> ClinicRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn get(&self, conn: &mut SqliteConnection) -> DatabaseResult<Clinic> {
        let row = sqlx::query(
            "SELECT id, name, address, phone, email, logo, description, settings, created_at, updated_at \
             FROM clinics WHERE id = ?",
        )
        .bind(self.clinic_id.as_str())
        .fetch_one(&mut *conn)
        .await?;

        map_clinic(&row)
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        changes: ClinicChanges,
    ) -> DatabaseResult<Clinic> {
        let settings = changes
            .settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "UPDATE clinics SET name = COALESCE(?, name), address = COALESCE(?, address), \
             phone = COALESCE(?, phone), email = COALESCE(?, email), \
             description = COALESCE(?, description), settings = COALESCE(?, settings), \
             updated_at = ? WHERE id = ?",
        )
        .bind(&changes.name)
        .bind(&changes.address)
        .bind(&changes.phone)
        .bind(&changes.email)
        .bind(&changes.description)
        .bind(settings)
        .bind(now())
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        self.get(conn).await
    }
}
