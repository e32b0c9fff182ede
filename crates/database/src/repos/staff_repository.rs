//! Users (staff and patient logins) of the current clinic.

use sqlx::SqliteConnection;

use super::accounts::{map_user, USER_COLUMNS};
use super::{new_id, now};
use crate::entities::{NewUser, User, UserChanges};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

pub struct StaffRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> StaffRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn list(&self, conn: &mut SqliteConnection) -> DatabaseResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE clinic_id = ? ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_user).collect()
    }

    pub async fn find(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_email(
        &self,
        conn: &mut SqliteConnection,
        email: &str,
    ) -> DatabaseResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE AND clinic_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, user: NewUser) -> DatabaseResult<User> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO users (id, clinic_id, email, password_hash, first_name, last_name, phone, role, \
             is_active, email_verified, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(user.email.trim().to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.email_verified)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(User {
            id,
            clinic_id: self.clinic_id.to_string(),
            email: user.email.trim().to_lowercase(),
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_active: true,
            email_verified: user.email_verified,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Returns `false` when no user with that id exists in this clinic.
    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: UserChanges,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET email = COALESCE(?, email), first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name), phone = COALESCE(?, phone), role = COALESCE(?, role), \
             is_active = COALESCE(?, is_active), updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(changes.email.map(|email| email.trim().to_lowercase()))
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(changes.role.map(|role| role.as_str()))
        .bind(changes.is_active)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removing a user cascades to its patient or doctor record and sessions.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ? AND clinic_id = ?")
            .bind(id)
            .bind(self.clinic_id.as_str())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn password_hash(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DatabaseResult<Option<String>> {
        let hash = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ? AND clinic_id = ?")
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(hash)
    }

    pub async fn set_password_hash(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        password_hash: &str,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(password_hash)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
