//! Clinic registration, staff invitations and password recovery.
//!
//! These flows run without a session, so each one resolves the clinic it
//! belongs to before touching tenant data.

use chrono::{Duration, Utc};
use medflow_auth::{hash_password, invite_token, reset_token, Principal};
use medflow_database::{
    accounts, token_repository, ClinicId, InviteToken, NewClinic, NewDoctor, NewInviteToken,
    NewUser, OneTimeToken, Role, Tenancy,
};
use tracing::{error, info, warn};

use crate::error::{ClinicError, ClinicResult};
use crate::mail::{invite_email, password_reset_email, Mailer};
use crate::models::{
    AcceptInviteRequest, AcceptInviteResponse, InviteRequest, PasswordResetConfirm, RegisterRequest,
    RegisterResponse,
};
use crate::validation::{non_blank, Validator};
use medflow_database::ClinicScope;

pub const INVITE_TTL_DAYS: i64 = 7;
pub const RESET_TTL_HOURS: i64 = 1;

const INVITABLE_ROLES: &[Role] = &[Role::Admin, Role::Doctor, Role::Receptionist];

/// Create a clinic together with its first administrator.
pub async fn register(tenancy: &Tenancy, req: RegisterRequest) -> ClinicResult<RegisterResponse> {
    let required = [
        &req.first_name,
        &req.last_name,
        &req.email,
        &req.password,
        &req.clinic_name,
    ];
    if required.iter().any(|value| value.trim().is_empty()) {
        return Err(ClinicError::bad_request("All fields are required"));
    }

    Validator::new()
        .email("email", &req.email)
        .password("password", &req.password)
        .finish()?;

    let email = req.email.trim().to_lowercase();
    let password_hash = hash_password(&req.password)?;

    let mut tx = tenancy.pool().begin().await?;
    if accounts::email_taken(&mut tx, &email).await? {
        return Err(ClinicError::bad_request("Email already registered"));
    }

    let phone = non_blank(req.phone);
    let clinic = accounts::create_clinic(
        &mut tx,
        NewClinic {
            name: req.clinic_name.trim().to_string(),
            email: Some(email.clone()),
            phone: phone.clone(),
        },
    )
    .await?;

    let scope = tenancy.scope(ClinicId::new(clinic.id.clone())?);
    let user = scope
        .staff()
        .insert(
            &mut tx,
            NewUser {
                email,
                password_hash,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                phone,
                role: Role::Admin,
                email_verified: true,
            },
        )
        .await
        .map_err(email_conflict)?;

    tx.commit().await?;
    info!(clinic_id = %clinic.id, user_id = %user.id, "clinic registered");

    Ok(RegisterResponse {
        message: "Account created successfully".to_string(),
        user_id: user.id,
        clinic_id: clinic.id,
    })
}

/// Store a seven-day invite and email the acceptance link.
///
/// The token is kept even when delivery fails; the error still reaches the caller.
pub async fn create_invite(
    scope: &ClinicScope,
    principal: &Principal,
    mailer: &dyn Mailer,
    app_url: &str,
    req: InviteRequest,
) -> ClinicResult<InviteToken> {
    let mut v = Validator::new();
    v.email("email", &req.email).required("role", &req.role);
    let role: Option<Role> = v.parse("role", non_blank(Some(req.role.clone())).as_deref());
    v.finish()?;

    let role = role.ok_or_else(|| ClinicError::bad_request("role is required"))?;
    if !INVITABLE_ROLES.contains(&role) {
        return Err(ClinicError::bad_request(
            "Invalid role. Must be one of: ADMIN, DOCTOR, RECEPTIONIST",
        ));
    }

    let mut conn = scope.acquire().await?;
    let invite = scope
        .invites()
        .insert(
            &mut conn,
            NewInviteToken {
                token: invite_token(),
                email: req.email.trim().to_string(),
                role,
                invited_by: principal.user_id.clone(),
                expires_at: Utc::now() + Duration::days(INVITE_TTL_DAYS),
            },
        )
        .await?;
    drop(conn);

    info!(clinic_id = %scope.clinic_id(), email = %invite.email, role = %invite.role, "invite created");

    let link = format!(
        "{}/auth/invite/accept?token={}",
        app_url.trim_end_matches('/'),
        invite.token
    );
    let message = invite_email(&invite.email, &link, &principal.clinic_name, &principal.email);
    mailer.send(message).await?;

    Ok(invite)
}

/// Redeem an invite: the new user joins the invite's clinic with the invited role.
pub async fn accept_invite(
    tenancy: &Tenancy,
    req: AcceptInviteRequest,
) -> ClinicResult<AcceptInviteResponse> {
    Validator::new()
        .required("token", &req.token)
        .required("firstName", &req.first_name)
        .required("lastName", &req.last_name)
        .password("password", &req.password)
        .finish()?;

    let invalid = || ClinicError::bad_request("Invalid or expired invite");

    let mut conn = tenancy.pool().acquire().await?;
    let invite = token_repository::find_invite_by_token(&mut conn, req.token.trim())
        .await?
        .filter(|invite| invite.is_redeemable(Utc::now()))
        .ok_or_else(invalid)?;
    drop(conn);

    let password_hash = hash_password(&req.password)?;
    let scope = tenancy.scope(ClinicId::new(invite.clinic_id.clone())?);

    let mut tx = scope.begin().await?;
    if !token_repository::consume_invite(&mut tx, &invite.id).await? {
        warn!(invite_id = %invite.id, "invite consumed concurrently");
        return Err(invalid());
    }

    if accounts::email_taken(&mut tx, &invite.email).await? {
        return Err(ClinicError::bad_request("Email already registered"));
    }

    let user = scope
        .staff()
        .insert(
            &mut tx,
            NewUser {
                email: invite.email.clone(),
                password_hash,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                phone: None,
                role: invite.role,
                email_verified: false,
            },
        )
        .await
        .map_err(email_conflict)?;

    if invite.role == Role::Doctor {
        scope
            .doctors()
            .insert(
                &mut tx,
                NewDoctor {
                    user_id: user.id.clone(),
                    ..NewDoctor::default()
                },
            )
            .await?;
    }

    tx.commit().await?;
    info!(clinic_id = %invite.clinic_id, user_id = %user.id, role = %invite.role, "invite accepted");

    Ok(AcceptInviteResponse {
        ok: true,
        user_id: user.id,
    })
}

/// Always succeeds from the caller's point of view, so the response never
/// reveals whether an account exists.
pub async fn request_password_reset(
    tenancy: &Tenancy,
    mailer: &dyn Mailer,
    app_url: &str,
    email: Option<&str>,
) {
    let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
        return;
    };

    if let Err(err) = issue_password_reset(tenancy, mailer, app_url, email).await {
        error!(error = %err, "password reset request failed");
    }
}

async fn issue_password_reset(
    tenancy: &Tenancy,
    mailer: &dyn Mailer,
    app_url: &str,
    email: &str,
) -> ClinicResult<()> {
    let mut conn = tenancy.pool().acquire().await?;
    let Some(user) = accounts::find_user_by_email(&mut conn, email).await? else {
        info!("password reset requested for unknown email");
        return Ok(());
    };

    let token = reset_token();
    let clinic_id = ClinicId::new(user.clinic_id.clone())?;
    token_repository::insert_reset_token(
        &mut conn,
        &clinic_id,
        &user.id,
        &token,
        Utc::now() + Duration::hours(RESET_TTL_HOURS),
    )
    .await?;
    drop(conn);

    let link = format!(
        "{}/auth/password-reset/accept?token={token}",
        app_url.trim_end_matches('/')
    );
    mailer.send(password_reset_email(&user.email, &link)).await?;
    info!(user_id = %user.id, "password reset issued");
    Ok(())
}

pub async fn confirm_password_reset(tenancy: &Tenancy, req: PasswordResetConfirm) -> ClinicResult<()> {
    Validator::new()
        .required("token", &req.token)
        .password("password", &req.password)
        .finish()?;

    let invalid = || ClinicError::bad_request("Invalid or expired token");

    let mut conn = tenancy.pool().acquire().await?;
    let token = token_repository::find_reset_token(&mut conn, req.token.trim())
        .await?
        .filter(|token| token.is_redeemable(Utc::now()))
        .ok_or_else(invalid)?;
    drop(conn);

    let password_hash = hash_password(&req.password)?;
    let scope = tenancy.scope(ClinicId::new(token.clinic_id.clone())?);

    let mut tx = scope.begin().await?;
    if !token_repository::consume_reset_token(&mut tx, &token.id).await? {
        return Err(invalid());
    }
    if !scope
        .staff()
        .set_password_hash(&mut tx, &token.user_id, &password_hash)
        .await?
    {
        return Err(invalid());
    }
    tx.commit().await?;

    info!(user_id = %token.user_id, "password reset completed");
    Ok(())
}

fn email_conflict(err: medflow_database::DatabaseError) -> ClinicError {
    if err.is_unique_violation() {
        ClinicError::bad_request("Email already registered")
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_test_db, RecordingMailer};

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: email.into(),
            password: "password123".into(),
            phone: Some("+100".into()),
            clinic_name: "Sunrise Clinic".into(),
        }
    }

    #[tokio::test]
    async fn register_creates_clinic_and_admin() {
        let (tenancy, _dir) = create_test_db().await;

        let response = register(&tenancy, registration("Owner@Clinic.test")).await.unwrap();
        assert_eq!(response.message, "Account created successfully");

        let scope = tenancy.scope(ClinicId::new(response.clinic_id.clone()).unwrap());
        let mut conn = scope.acquire().await.unwrap();
        let admin = scope.staff().find(&mut conn, &response.user_id).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "owner@clinic.test");
        let clinic = scope.clinic().get(&mut conn).await.unwrap();
        assert_eq!(clinic.name, "Sunrise Clinic");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_case_insensitively() {
        let (tenancy, _dir) = create_test_db().await;
        register(&tenancy, registration("owner@clinic.test")).await.unwrap();

        let err = register(&tenancy, registration("OWNER@clinic.test")).await.unwrap_err();
        assert!(matches!(err, ClinicError::BadRequest(msg) if msg == "Email already registered"));
    }

    #[tokio::test]
    async fn register_requires_every_field() {
        let (tenancy, _dir) = create_test_db().await;
        let mut req = registration("owner@clinic.test");
        req.clinic_name = " ".into();

        let err = register(&tenancy, req).await.unwrap_err();
        assert!(matches!(err, ClinicError::BadRequest(msg) if msg == "All fields are required"));
    }

    #[tokio::test]
    async fn password_reset_for_unknown_email_sends_nothing() {
        let (tenancy, _dir) = create_test_db().await;
        let mailer = RecordingMailer::default();

        request_password_reset(&tenancy, &mailer, "http://app.test", Some("ghost@nowhere.test")).await;
        request_password_reset(&tenancy, &mailer, "http://app.test", None).await;

        assert!(mailer.sent().is_empty());
    }
}
