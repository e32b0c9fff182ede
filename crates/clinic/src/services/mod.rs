//! Clinic workflows.
//!
//! Each module exposes free async functions over a [`medflow_database::ClinicScope`]
//! (or a [`medflow_database::Tenancy`] for flows that start without a session)
//! and the caller's [`medflow_auth::Principal`]. Role checks happen in the HTTP
//! layer; the checks that depend on who the caller is, such as patients only
//! seeing their own records, live here.

pub mod appointments;
pub mod billing;
pub mod catalog;
pub mod consultations;
pub mod doctors;
pub mod invoices;
pub mod onboarding;
pub mod patients;
pub mod portal;
pub mod prescriptions;
pub mod seed;
pub mod settings;
pub mod staff;

#[cfg(test)]
pub(crate) mod test_utils;

use medflow_auth::Principal;
use medflow_database::{ClinicScope, Role};
use sqlx::SqliteConnection;

use crate::error::ClinicResult;

/// The patient record of a caller with the PATIENT role. `None` for staff,
/// and for patient accounts whose record has been removed.
pub(crate) async fn own_patient_id(
    scope: &ClinicScope,
    conn: &mut SqliteConnection,
    principal: &Principal,
) -> ClinicResult<Option<String>> {
    if principal.role != Role::Patient {
        return Ok(None);
    }
    let patient = scope.patients().find_by_user(conn, &principal.user_id).await?;
    Ok(patient.map(|p| p.id))
}
