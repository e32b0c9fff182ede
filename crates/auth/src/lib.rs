use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use medflow_config::AuthConfig;
use medflow_database::{ClinicId, Role};
use rand::RngCore;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

pub mod tokens;

pub use tokens::{generate_password, invite_token, reset_token};

const PRINCIPAL_COLUMNS: &str = "u.id AS user_id, u.clinic_id, u.email, u.first_name, u.last_name, \
     u.role, u.is_active, c.name AS clinic_name";

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error("Forbidden")]
    Forbidden,
}

/// The authenticated caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "id")]
    pub user_id: String,
    pub clinic_id: ClinicId,
    pub role: Role,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub clinic_name: String,
}

impl Principal {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn require_role(&self, roles: &[Role]) -> Result<(), AuthError> {
        if self.has_role(roles) {
            Ok(())
        } else {
            debug!(user = %self.user_id, role = %self.role, "role not permitted");
            Err(AuthError::Forbidden)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let ttl = i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX);
        Self {
            pool,
            session_ttl: Duration::seconds(ttl),
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Verify email and password and open a new session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Principal, AuthSession), AuthError> {
        let sql = format!(
            "SELECT {PRINCIPAL_COLUMNS}, u.password_hash FROM users u \
             JOIN clinics c ON c.id = u.clinic_id WHERE u.email = ? COLLATE NOCASE"
        );
        let row = sqlx::query(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        let password_hash: String = row.try_get("password_hash")?;
        if !verify_password(password, &password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let is_active: bool = row.try_get("is_active")?;
        if !is_active {
            return Err(AuthError::AccountDisabled);
        }

        let principal = map_principal(&row)?;
        let session = self.issue_session(&principal.user_id).await?;
        info!(user = %principal.user_id, clinic = %principal.clinic_id, "user logged in");

        Ok((principal, session))
    }

    /// Resolve a bearer token. Expired sessions are deleted when encountered.
    pub async fn authenticate_token(&self, token: &str) -> Result<(Principal, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: String = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let principal = self.principal(&user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((principal, session))
    }

    /// Load the caller behind `user_id`; disabled accounts are refused.
    pub async fn principal(&self, user_id: &str) -> Result<Principal, AuthError> {
        let sql = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM users u JOIN clinics c ON c.id = u.clinic_id WHERE u.id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let is_active: bool = row.try_get("is_active")?;
        if !is_active {
            return Err(AuthError::AccountDisabled);
        }

        map_principal(&row)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn issue_session(&self, user_id: &str) -> Result<AuthSession, AuthError> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id: user_id.to_owned(),
            expires_at,
        })
    }
}

fn map_principal(row: &SqliteRow) -> Result<Principal, AuthError> {
    let clinic_id: String = row.try_get("clinic_id")?;
    let role: String = row.try_get("role")?;

    Ok(Principal {
        user_id: row.try_get("user_id")?,
        clinic_id: ClinicId::new(clinic_id).map_err(|_| AuthError::InvalidSession)?,
        role: role.parse().map_err(|_| AuthError::InvalidSession)?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        clinic_name: row.try_get("clinic_name")?,
    })
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: "user-1".into(),
            clinic_id: ClinicId::new("clinic-1").unwrap(),
            role,
            email: "someone@example.com".into(),
            first_name: "Sam".into(),
            last_name: "Lee".into(),
            clinic_name: "Clinic".into(),
        }
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn unreadable_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::PasswordHash(_))
        ));
    }

    #[test]
    fn require_role_rejects_unlisted_roles() {
        let receptionist = principal(Role::Receptionist);
        assert!(receptionist.require_role(&[Role::Admin, Role::Receptionist]).is_ok());
        assert!(matches!(
            receptionist.require_role(&[Role::Admin]),
            Err(AuthError::Forbidden)
        ));
        assert!(principal(Role::Patient).require_role(Role::STAFF).is_err());
    }

    #[test]
    fn session_tokens_are_url_safe_and_unique() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
