//! Clinic user administration. New staff join through invites.

use medflow_auth::Principal;
use medflow_database::{ClinicScope, Role, User, UserChanges};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::mail::Mailer;
use crate::models::{InviteRequest, StaffInviteResponse, UpdateStaffRequest};
use crate::services::onboarding;
use crate::validation::{is_valid_email, non_blank, Validator};

pub async fn list(scope: &ClinicScope) -> ClinicResult<Vec<User>> {
    let mut conn = scope.acquire().await?;
    Ok(scope.staff().list(&mut conn).await?)
}

pub async fn get(scope: &ClinicScope, id: &str) -> ClinicResult<User> {
    let mut conn = scope.acquire().await?;
    scope
        .staff()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("User"))
}

pub async fn invite(
    scope: &ClinicScope,
    principal: &Principal,
    mailer: &dyn Mailer,
    app_url: &str,
    req: InviteRequest,
) -> ClinicResult<StaffInviteResponse> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.role.trim().is_empty() {
        return Err(ClinicError::bad_request("Email and role are required"));
    }
    if !is_valid_email(&email) {
        return Err(ClinicError::bad_request("Invalid email format"));
    }
    let role_allowed = req
        .role
        .parse::<Role>()
        .map(|role| role.is_staff())
        .unwrap_or(false);
    if !role_allowed {
        return Err(ClinicError::bad_request(
            "Invalid role. Must be one of: ADMIN, DOCTOR, RECEPTIONIST",
        ));
    }

    {
        let mut conn = scope.acquire().await?;
        if scope.staff().find_by_email(&mut conn, &email).await?.is_some() {
            return Err(ClinicError::conflict(
                "A user with this email already exists in your clinic",
            ));
        }
    }

    onboarding::create_invite(
        scope,
        principal,
        mailer,
        app_url,
        InviteRequest {
            email: email.clone(),
            role: req.role,
        },
    )
    .await?;

    Ok(StaffInviteResponse {
        success: true,
        message: "Invitation sent successfully".to_string(),
        email,
    })
}

pub async fn update(scope: &ClinicScope, id: &str, req: UpdateStaffRequest) -> ClinicResult<User> {
    let mut v = Validator::new();
    let role: Option<Role> = v.parse("role", non_blank(req.role).as_deref());
    v.finish()?;

    let mut conn = scope.acquire().await?;
    let changes = UserChanges {
        first_name: non_blank(req.first_name),
        last_name: non_blank(req.last_name),
        role,
        is_active: req.is_active,
        ..UserChanges::default()
    };
    if !scope.staff().update(&mut conn, id, changes).await? {
        return Err(ClinicError::NotFound("User"));
    }

    let user = scope
        .staff()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("User"))?;
    info!(clinic_id = %scope.clinic_id(), user_id = %id, role = %user.role, active = user.is_active, "staff member updated");
    Ok(user)
}

pub async fn delete(scope: &ClinicScope, id: &str) -> ClinicResult<()> {
    let mut conn = scope.acquire().await?;
    if !scope.staff().delete(&mut conn, id).await? {
        return Err(ClinicError::NotFound("User"));
    }
    info!(clinic_id = %scope.clinic_id(), user_id = %id, "staff member deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_test_db, seed_clinic, RecordingMailer};

    fn invite_request(email: &str, role: &str) -> InviteRequest {
        InviteRequest {
            email: email.into(),
            role: role.into(),
        }
    }

    #[tokio::test]
    async fn invite_sends_mail_with_accept_link() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;
        let mailer = RecordingMailer::default();

        let response = invite(
            &clinic.scope,
            &clinic.admin,
            &mailer,
            "http://app.test/",
            invite_request("new.doc@north.test", "DOCTOR"),
        )
        .await
        .unwrap();
        assert!(response.success);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "new.doc@north.test");
        assert!(sent[0].html.contains("http://app.test/auth/invite/accept?token="));
    }

    #[tokio::test]
    async fn invite_rejects_existing_members_and_bad_roles() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;
        let mailer = RecordingMailer::default();

        let err = invite(
            &clinic.scope,
            &clinic.admin,
            &mailer,
            "http://app.test",
            invite_request(&clinic.doctor.email, "DOCTOR"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        let err = invite(
            &clinic.scope,
            &clinic.admin,
            &mailer,
            "http://app.test",
            invite_request("someone@north.test", "PATIENT"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClinicError::BadRequest(msg) if msg.starts_with("Invalid role")));

        let err = invite(
            &clinic.scope,
            &clinic.admin,
            &mailer,
            "http://app.test",
            invite_request("", "DOCTOR"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClinicError::BadRequest(msg) if msg == "Email and role are required"));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn update_role_and_deactivate() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;

        let updated = update(
            &clinic.scope,
            &clinic.receptionist.user_id,
            UpdateStaffRequest {
                role: Some("admin".into()),
                is_active: Some(false),
                ..UpdateStaffRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(!updated.is_active);
        assert_eq!(updated.first_name, "RECEPTIONIST");
    }

    #[tokio::test]
    async fn staff_of_other_clinics_is_not_found() {
        let (tenancy, _dir) = create_test_db().await;
        let north = seed_clinic(&tenancy, "North").await;
        let south = seed_clinic(&tenancy, "South").await;

        assert!(matches!(
            get(&south.scope, &north.doctor.user_id).await,
            Err(ClinicError::NotFound("User"))
        ));
        assert!(delete(&south.scope, &north.doctor.user_id).await.is_err());
        assert_eq!(list(&south.scope).await.unwrap().len(), 4);
    }
}
