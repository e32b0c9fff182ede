use medflow_auth::{hash_password, verify_password, Principal};
use medflow_database::{Clinic, ClinicChanges, ClinicScope, User, UserChanges};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::models::{UpdateClinicRequest, UpdateProfileRequest};
use crate::validation::{is_valid_email, non_blank, Validator};

pub async fn profile(scope: &ClinicScope, principal: &Principal) -> ClinicResult<User> {
    let mut conn = scope.acquire().await?;
    scope
        .staff()
        .find(&mut conn, &principal.user_id)
        .await?
        .ok_or(ClinicError::NotFound("User"))
}

/// Update names and phone; the password changes only when both the current
/// and the new password are supplied.
pub async fn update_profile(
    scope: &ClinicScope,
    principal: &Principal,
    req: UpdateProfileRequest,
) -> ClinicResult<User> {
    let mut v = Validator::new();
    v.check("firstName", !req.first_name.trim().is_empty(), "First name is required")
        .check("lastName", !req.last_name.trim().is_empty(), "Last name is required");
    v.finish()?;

    let current = non_blank(req.current_password);
    let new = non_blank(req.new_password);
    let password_change = match (current, new) {
        (Some(current), Some(new)) => Some((current, new)),
        (None, None) => None,
        _ => {
            return Err(ClinicError::bad_request(
                "Both current and new password are required to change password",
            ))
        }
    };

    let mut tx = scope.begin().await?;

    if let Some((current, new)) = password_change {
        let stored = scope
            .staff()
            .password_hash(&mut tx, &principal.user_id)
            .await?
            .ok_or(ClinicError::NotFound("User"))?;
        if !verify_password(&current, &stored)? {
            return Err(ClinicError::bad_request("Current password is incorrect"));
        }
        Validator::new().password("newPassword", &new).finish()?;
        let hash = hash_password(&new)?;
        scope
            .staff()
            .set_password_hash(&mut tx, &principal.user_id, &hash)
            .await?;
        info!(user_id = %principal.user_id, "password changed");
    }

    let updated = scope
        .staff()
        .update(
            &mut tx,
            &principal.user_id,
            UserChanges {
                first_name: Some(req.first_name.trim().to_string()),
                last_name: Some(req.last_name.trim().to_string()),
                phone: req.phone,
                ..UserChanges::default()
            },
        )
        .await?;
    if !updated {
        return Err(ClinicError::NotFound("User"));
    }

    let user = scope
        .staff()
        .find(&mut tx, &principal.user_id)
        .await?
        .ok_or(ClinicError::NotFound("User"))?;
    tx.commit().await?;
    Ok(user)
}

pub async fn clinic(scope: &ClinicScope) -> ClinicResult<Clinic> {
    let mut conn = scope.acquire().await?;
    Ok(scope.clinic().get(&mut conn).await?)
}

pub async fn update_clinic(scope: &ClinicScope, req: UpdateClinicRequest) -> ClinicResult<Clinic> {
    let mut v = Validator::new();
    v.check("name", !req.name.trim().is_empty(), "Clinic name is required");
    if let Some(email) = req.email.as_deref().filter(|e| !e.trim().is_empty()) {
        v.check("email", is_valid_email(email), "Invalid email");
    }
    if let Some(settings) = &req.settings {
        v.check("settings", settings.is_object(), "settings must be an object");
    }
    v.finish()?;

    let mut conn = scope.acquire().await?;
    let clinic = scope
        .clinic()
        .update(
            &mut conn,
            ClinicChanges {
                name: Some(req.name.trim().to_string()),
                address: req.address,
                phone: req.phone,
                email: req.email,
                description: req.description,
                settings: req.settings,
            },
        )
        .await?;

    info!(clinic_id = %clinic.id, "clinic settings updated");
    Ok(clinic)
}
