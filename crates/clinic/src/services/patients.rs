use medflow_auth::{generate_password, hash_password};
use medflow_database::{
    accounts, ClinicScope, Gender, NewPatient, NewUser, Patient, PatientChanges, Role, UserChanges,
};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreatePatientRequest, UpdatePatientRequest};
use crate::validation::{non_blank, Validator};

pub async fn list(scope: &ClinicScope) -> ClinicResult<Vec<Patient>> {
    let mut conn = scope.acquire().await?;
    Ok(scope.patients().list(&mut conn).await?)
}

pub async fn get(scope: &ClinicScope, id: &str) -> ClinicResult<Patient> {
    let mut conn = scope.acquire().await?;
    scope
        .patients()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Patient"))
}

/// Create the patient's login and clinical record together.
pub async fn create(scope: &ClinicScope, req: CreatePatientRequest) -> ClinicResult<Patient> {
    let mut v = Validator::new();
    v.required("firstName", &req.first_name)
        .required("lastName", &req.last_name)
        .email("email", &req.email);
    if let Some(password) = &req.password {
        v.password("password", password);
    }
    let gender: Option<Gender> = v.parse("gender", non_blank(req.gender.clone()).as_deref());
    v.finish()?;

    let email = req.email.trim().to_lowercase();
    let password = req.password.clone().unwrap_or_else(generate_password);
    let password_hash = hash_password(&password)?;

    let mut tx = scope.begin().await?;
    if accounts::email_taken(&mut tx, &email).await? {
        return Err(ClinicError::bad_request("Email already registered"));
    }

    let user = scope
        .staff()
        .insert(
            &mut tx,
            NewUser {
                email,
                password_hash,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                phone: non_blank(req.phone),
                role: Role::Patient,
                email_verified: false,
            },
        )
        .await?;

    let patient = scope
        .patients()
        .insert(
            &mut tx,
            NewPatient {
                user_id: user.id,
                date_of_birth: non_blank(req.date_of_birth),
                gender,
                blood_type: non_blank(req.blood_type),
                address: non_blank(req.address),
                emergency_contact: non_blank(req.emergency_contact),
                allergies: non_blank(req.allergies),
                chronic_conditions: non_blank(req.chronic_conditions),
            },
        )
        .await?;
    tx.commit().await?;

    info!(clinic_id = %scope.clinic_id(), patient_id = %patient.id, "patient created");
    Ok(patient)
}

/// Partial update of the login (`user`) and clinical (`patient`) sections.
pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdatePatientRequest,
) -> ClinicResult<Patient> {
    let mut v = Validator::new();
    if let Some(email) = req.user.as_ref().and_then(|u| u.email.as_deref()) {
        v.email("email", email);
    }
    let gender: Option<Gender> = v.parse(
        "gender",
        req.patient
            .as_ref()
            .and_then(|p| p.gender.as_deref())
            .filter(|g| !g.trim().is_empty()),
    );
    v.finish()?;

    let mut tx = scope.begin().await?;
    let existing = scope
        .patients()
        .find(&mut tx, id)
        .await?
        .ok_or(ClinicError::NotFound("Patient"))?;

    if let Some(user) = req.user {
        let email = user.email.map(|e| e.trim().to_lowercase());
        if let Some(email) = &email {
            if !email.eq_ignore_ascii_case(&existing.email)
                && accounts::email_taken(&mut tx, email).await?
            {
                return Err(ClinicError::bad_request("Email already registered"));
            }
        }
        scope
            .staff()
            .update(
                &mut tx,
                &existing.user_id,
                UserChanges {
                    email,
                    first_name: non_blank(user.first_name),
                    last_name: non_blank(user.last_name),
                    phone: user.phone,
                    ..UserChanges::default()
                },
            )
            .await?;
    }

    if let Some(details) = req.patient {
        scope
            .patients()
            .update(
                &mut tx,
                id,
                PatientChanges {
                    date_of_birth: details.date_of_birth,
                    gender,
                    blood_type: details.blood_type,
                    address: details.address,
                    emergency_contact: details.emergency_contact,
                    allergies: details.allergies,
                    chronic_conditions: details.chronic_conditions,
                },
            )
            .await?;
    }

    let updated = scope
        .patients()
        .find(&mut tx, id)
        .await?
        .ok_or(ClinicError::NotFound("Patient"))?;
    tx.commit().await?;
    Ok(updated)
}

/// Removing the user cascades to the patient record and its clinical history.
pub async fn delete(scope: &ClinicScope, id: &str) -> ClinicResult<()> {
    let mut tx = scope.begin().await?;
    let patient = scope
        .patients()
        .find(&mut tx, id)
        .await?
        .ok_or(ClinicError::NotFound("Patient"))?;

    scope.staff().delete(&mut tx, &patient.user_id).await?;
    tx.commit().await?;

    info!(clinic_id = %scope.clinic_id(), patient_id = %id, "patient deleted");
    Ok(())
}
