use chrono::{DateTime, Duration, Utc};
use medflow_auth::{hash_password, AuthError, Authenticator};
use medflow_config::AuthConfig;
use medflow_database::Role;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    _temp_dir: TempDir,
    config: AuthConfig,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let config = AuthConfig {
            session_ttl_seconds: 3_600,
        };
        let authenticator = Authenticator::new(pool.clone(), &config);

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
            config,
        })
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    async fn create_user(&self, email: &str, password: &str, role: Role) -> TestResult<String> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO clinics (id, name, settings, created_at, updated_at) \
             VALUES ('clinic-1', 'Riverside Clinic', '{}', ?, ?)",
        )
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;

        let user_id = format!("user-{}", email.split('@').next().unwrap_or("x"));
        sqlx::query(
            "INSERT INTO users (id, clinic_id, email, password_hash, first_name, last_name, role, \
             is_active, email_verified, created_at, updated_at) \
             VALUES (?, 'clinic-1', ?, ?, 'Alice', 'Example', ?, 1, 1, ?, ?)",
        )
        .bind(&user_id)
        .bind(email)
        .bind(hash_password(password)?)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await?;

        Ok(user_id)
    }
}

#[tokio::test]
async fn login_returns_principal_and_session_for_valid_credentials() -> TestResult {
    let ctx = TestContext::new().await?;
    let user_id = ctx.create_user("alice@example.com", "s3cret", Role::Admin).await?;

    let (principal, session) = ctx
        .authenticator()
        .login("alice@example.com", "s3cret")
        .await?;

    assert_eq!(principal.user_id, user_id);
    assert_eq!(principal.clinic_id.as_str(), "clinic-1");
    assert_eq!(principal.role, Role::Admin);
    assert_eq!(principal.clinic_name, "Riverside Clinic");

    let ttl = Duration::seconds(ctx.config.session_ttl_seconds as i64);
    let remaining = session.expires_at - Utc::now();
    assert!(
        (remaining - ttl).num_seconds().abs() <= 2,
        "session ttl should respect configuration"
    );

    let stored_expires: String =
        sqlx::query_scalar("SELECT expires_at FROM sessions WHERE token = ?")
            .bind(&session.token)
            .fetch_one(ctx.pool())
            .await?;
    let parsed = DateTime::parse_from_rfc3339(&stored_expires)?.with_timezone(&Utc);
    assert_eq!(parsed, session.expires_at);

    Ok(())
}

#[tokio::test]
async fn login_matches_email_case_insensitively() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.create_user("alice@example.com", "s3cret", Role::Doctor).await?;

    let (principal, _) = ctx
        .authenticator()
        .login("Alice@Example.com", "s3cret")
        .await?;
    assert_eq!(principal.role, Role::Doctor);

    Ok(())
}

#[tokio::test]
async fn login_rejects_incorrect_secret() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.create_user("alice@example.com", "s3cret", Role::Admin).await?;

    let err = ctx
        .authenticator()
        .login("alice@example.com", "bad-secret")
        .await
        .expect_err("expected invalid password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    let session_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(session_count, 0, "no sessions should be issued on failure");

    Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_email() -> TestResult {
    let ctx = TestContext::new().await?;
    let err = ctx
        .authenticator()
        .login("unknown@example.com", "secret")
        .await
        .expect_err("expected unknown email to fail");
    assert!(matches!(err, AuthError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn login_rejects_disabled_accounts() -> TestResult {
    let ctx = TestContext::new().await?;
    let user_id = ctx.create_user("alice@example.com", "s3cret", Role::Receptionist).await?;
    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(&user_id)
        .execute(ctx.pool())
        .await?;

    let err = ctx
        .authenticator()
        .login("alice@example.com", "s3cret")
        .await
        .expect_err("disabled account must not log in");
    assert!(matches!(err, AuthError::AccountDisabled));
    Ok(())
}

#[tokio::test]
async fn authenticate_token_returns_principal_for_active_token() -> TestResult {
    let ctx = TestContext::new().await?;
    let user_id = ctx.create_user("alice@example.com", "s3cret", Role::Patient).await?;
    let (_, session) = ctx
        .authenticator()
        .login("alice@example.com", "s3cret")
        .await?;

    let (principal, resolved) = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await?;

    assert_eq!(principal.user_id, user_id);
    assert_eq!(principal.role, Role::Patient);
    assert_eq!(resolved.token, session.token);
    assert_eq!(resolved.expires_at, session.expires_at);

    Ok(())
}

#[tokio::test]
async fn authenticate_token_rejects_unknown_token() -> TestResult {
    let ctx = TestContext::new().await?;
    let err = ctx
        .authenticator()
        .authenticate_token("does-not-exist")
        .await
        .expect_err("unknown token should fail");
    assert!(matches!(err, AuthError::SessionNotFound));
    Ok(())
}

#[tokio::test]
async fn authenticate_token_removes_expired_sessions() -> TestResult {
    let ctx = TestContext::new().await?;
    let user_id = ctx.create_user("alice@example.com", "s3cret", Role::Admin).await?;

    let past = (Utc::now() - Duration::minutes(5)).to_rfc3339();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ('stale', ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(&past)
    .bind(&past)
    .execute(ctx.pool())
    .await?;

    let err = ctx
        .authenticator()
        .authenticate_token("stale")
        .await
        .expect_err("expired session should fail");
    assert!(matches!(err, AuthError::SessionExpired));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = 'stale'")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(remaining, 0, "expired session should be deleted");

    Ok(())
}

#[tokio::test]
async fn authenticate_token_rejects_disabled_user() -> TestResult {
    let ctx = TestContext::new().await?;
    let user_id = ctx.create_user("alice@example.com", "s3cret", Role::Doctor).await?;
    let session = ctx.authenticator().issue_session(&user_id).await?;

    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(&user_id)
        .execute(ctx.pool())
        .await?;

    let err = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await
        .expect_err("disabled user should be rejected");
    assert!(matches!(err, AuthError::AccountDisabled));
    Ok(())
}

#[tokio::test]
async fn logout_deletes_the_session() -> TestResult {
    let ctx = TestContext::new().await?;
    ctx.create_user("alice@example.com", "s3cret", Role::Admin).await?;
    let (_, session) = ctx
        .authenticator()
        .login("alice@example.com", "s3cret")
        .await?;

    ctx.authenticator().logout(&session.token).await?;

    let err = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await
        .expect_err("session should be gone");
    assert!(matches!(err, AuthError::SessionNotFound));
    Ok(())
}
