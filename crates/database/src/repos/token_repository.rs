//! Invite and password-reset tokens.
//!
//! Issuing an invite happens inside a clinic. Redeeming a token happens before
//! the caller is authenticated, so lookups go by the token value alone and the
//! clinic is taken from the stored row.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now, timestamp_column};
use crate::entities::{InviteToken, NewInviteToken, PasswordResetToken};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

fn map_invite(row: &SqliteRow) -> DatabaseResult<InviteToken> {
    Ok(InviteToken {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        email: row.try_get("email")?,
        role: enum_column(row, "role")?,
        clinic_id: row.try_get("clinic_id")?,
        invited_by: row.try_get("invited_by")?,
        expires_at: timestamp_column(row, "expires_at")?,
        used: row.try_get("used")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_reset(row: &SqliteRow) -> DatabaseResult<PasswordResetToken> {
    Ok(PasswordResetToken {
        id: row.try_get("id")?,
        token: row.try_get("token")?,
        user_id: row.try_get("user_id")?,
        clinic_id: row.try_get("clinic_id")?,
        expires_at: timestamp_column(row, "expires_at")?,
        used: row.try_get("used")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct InviteRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> InviteRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        invite: NewInviteToken,
    ) -> DatabaseResult<InviteToken> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO invite_tokens (id, token, email, role, clinic_id, invited_by, expires_at, used, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&invite.token)
        .bind(invite.email.to_lowercase())
        .bind(invite.role.as_str())
        .bind(self.clinic_id.as_str())
        .bind(&invite.invited_by)
        .bind(invite.expires_at.to_rfc3339())
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(InviteToken {
            id,
            token: invite.token,
            email: invite.email.to_lowercase(),
            role: invite.role,
            clinic_id: self.clinic_id.to_string(),
            invited_by: invite.invited_by,
            expires_at: invite.expires_at,
            used: false,
            created_at: now,
        })
    }
}

pub async fn find_invite_by_token(
    conn: &mut SqliteConnection,
    token: &str,
) -> DatabaseResult<Option<InviteToken>> {
    let row = sqlx::query(
        "SELECT id, token, email, role, clinic_id, invited_by, expires_at, used, created_at \
         FROM invite_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_invite).transpose()
}

/// Marks the invite used. Returns false when another request got there first.
pub async fn consume_invite(conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
    let result = sqlx::query("UPDATE invite_tokens SET used = 1 WHERE id = ? AND used = 0")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_reset_token(
    conn: &mut SqliteConnection,
    clinic_id: &ClinicId,
    user_id: &str,
    token: &str,
    expires_at: DateTime<Utc>,
) -> DatabaseResult<PasswordResetToken> {
    let id = new_id();
    let now = now();

    sqlx::query(
        "INSERT INTO password_reset_tokens (id, token, user_id, clinic_id, expires_at, used, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(token)
    .bind(user_id)
    .bind(clinic_id.as_str())
    .bind(expires_at.to_rfc3339())
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(PasswordResetToken {
        id,
        token: token.to_string(),
        user_id: user_id.to_string(),
        clinic_id: clinic_id.to_string(),
        expires_at,
        used: false,
        created_at: now,
    })
}

pub async fn find_reset_token(
    conn: &mut SqliteConnection,
    token: &str,
) -> DatabaseResult<Option<PasswordResetToken>> {
    let row = sqlx::query(
        "SELECT id, token, user_id, clinic_id, expires_at, used, created_at \
         FROM password_reset_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_reset).transpose()
}

/// Marks the reset token used. Returns false when it was already consumed.
pub async fn consume_reset_token(conn: &mut SqliteConnection, id: &str) -> DatabaseResult<bool> {
    let result = sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE id = ? AND used = 0")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}
