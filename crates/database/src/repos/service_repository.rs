//! Service catalogue of the current clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now};
use crate::entities::{NewService, Service, ServiceChanges};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const SERVICE_COLUMNS: &str =
    "id, clinic_id, name, description, price, duration, category, is_active, created_at, updated_at";

fn map_service(row: &SqliteRow) -> DatabaseResult<Service> {
    Ok(Service {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        duration: row.try_get("duration")?,
        category: enum_column(row, "category")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct ServiceRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> ServiceRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list(&self, conn: &mut SqliteConnection) -> DatabaseResult<Vec<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE clinic_id = ? ORDER BY name");
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_service).collect()
    }

    pub async fn find(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_service).transpose()
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, service: NewService) -> DatabaseResult<Service> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO services (id, clinic_id, name, description, price, duration, category, is_active, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.price)
        .bind(service.duration)
        .bind(service.category.as_str())
        .bind(service.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(Service {
            id,
            clinic_id: self.clinic_id.to_string(),
            name: service.name,
            description: service.description,
            price: service.price,
            duration: service.duration,
            category: service.category,
            is_active: service.is_active,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: ServiceChanges,
    ) -> DatabaseResult<Option<Service>> {
        let result = sqlx::query(
            "UPDATE services SET name = COALESCE(?, name), description = COALESCE(?, description), \
             price = COALESCE(?, price), duration = COALESCE(?, duration), category = COALESCE(?, category), \
             is_active = COALESCE(?, is_active), updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(changes.duration)
        .bind(changes.category.map(|category| category.as_str()))
        .bind(changes.is_active)
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

    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = ? AND clinic_id = ?")
            .bind(id)
            .bind(self.clinic_id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
