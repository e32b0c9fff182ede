//! Account lookups that cross clinic boundaries.
//!
//! Email addresses are unique across the whole installation, so registration,
//! login and password recovery must consult every clinic.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now};
use crate::entities::{Clinic, NewClinic, User};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

pub(crate) const USER_COLUMNS: &str = "id, clinic_id, email, first_name, last_name, phone, role, \
     is_active, email_verified, created_at, updated_at";

pub(crate) fn map_user(row: &SqliteRow) -> DatabaseResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        role: enum_column(row, "role")?,
        is_active: row.try_get("is_active")?,
        email_verified: row.try_get("email_verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn email_taken(conn: &mut SqliteConnection, email: &str) -> DatabaseResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE")
        .bind(email)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn find_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> DatabaseResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_user).transpose()
}

/// Create a new tenant. The caller is responsible for creating its first admin.
pub async fn create_clinic(conn: &mut SqliteConnection, clinic: NewClinic) -> DatabaseResult<Clinic> {
    let id = new_id();
    let now = now();

    sqlx::query(
        "INSERT INTO clinics (id, name, email, phone, settings, created_at, updated_at) \
         VALUES (?, ?, ?, ?, '{}', ?, ?)",
    )
    .bind(&id)
    .bind(&clinic.name)
    .bind(&clinic.email)
    .bind(&clinic.phone)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let clinic_id = ClinicId::new(id)?;
    super::ClinicRepository::new(&clinic_id).get(conn).await
}
