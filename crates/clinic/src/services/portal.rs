//! Read-only views for patients over their own records.

use medflow_auth::Principal;
use medflow_database::{
    Appointment, AppointmentFilter, ClinicScope, Invoice, InvoiceFilter, Prescription,
    PrescriptionFilter,
};

use crate::error::{ClinicError, ClinicResult};
use crate::services::own_patient_id;

async fn patient_id(scope: &ClinicScope, principal: &Principal) -> ClinicResult<String> {
    let mut conn = scope.acquire().await?;
    own_patient_id(scope, &mut conn, principal)
        .await?
        .ok_or(ClinicError::NotFound("Patient"))
}

pub async fn appointments(scope: &ClinicScope, principal: &Principal) -> ClinicResult<Vec<Appointment>> {
    let patient_id = patient_id(scope, principal).await?;
    let mut conn = scope.acquire().await?;
    let filter = AppointmentFilter {
        patient_id: Some(patient_id),
        ..AppointmentFilter::default()
    };
    Ok(scope.appointments().list(&mut conn, &filter).await?)
}

pub async fn prescriptions(
    scope: &ClinicScope,
    principal: &Principal,
) -> ClinicResult<Vec<Prescription>> {
    let patient_id = patient_id(scope, principal).await?;
    let mut conn = scope.acquire().await?;
    let filter = PrescriptionFilter {
        patient_id: Some(patient_id),
        ..PrescriptionFilter::default()
    };
    Ok(scope.prescriptions().list(&mut conn, &filter).await?)
}

pub async fn invoices(scope: &ClinicScope, principal: &Principal) -> ClinicResult<Vec<Invoice>> {
    let patient_id = patient_id(scope, principal).await?;
    let mut conn = scope.acquire().await?;
    let filter = InvoiceFilter {
        patient_id: Some(patient_id),
    };
    Ok(scope.invoices().list(&mut conn, &filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateAppointmentRequest;
    use crate::services::appointments as booking;
    use crate::services::test_utils::{create_test_db, seed_clinic};

    #[tokio::test]
    async fn patient_sees_only_own_appointments() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;
        let other = crate::services::patients::create(
            &clinic.scope,
            crate::models::CreatePatientRequest {
                first_name: "Other".into(),
                last_name: "Person".into(),
                email: "other@north.test".into(),
                phone: None,
                password: None,
                date_of_birth: None,
                gender: None,
                blood_type: None,
                address: None,
                emergency_contact: None,
                allergies: None,
                chronic_conditions: None,
            },
        )
        .await
        .unwrap();

        for (patient_id, start, end) in [
            (clinic.patient_id.clone(), "09:00", "09:30"),
            (other.id.clone(), "10:00", "10:30"),
        ] {
            booking::create(
                &clinic.scope,
                &clinic.admin,
                CreateAppointmentRequest {
                    patient_id: Some(patient_id),
                    doctor_id: clinic.doctor_id.clone(),
                    service_id: None,
                    appointment_date: "2024-02-02".into(),
                    start_time: start.into(),
                    end_time: end.into(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        let own = appointments(&clinic.scope, &clinic.patient).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].patient_id, clinic.patient_id);
        assert!(invoices(&clinic.scope, &clinic.patient).await.unwrap().is_empty());
        assert!(prescriptions(&clinic.scope, &clinic.patient).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn staff_have_no_portal_record() {
        let (tenancy, _dir) = create_test_db().await;
        let clinic = seed_clinic(&tenancy, "North").await;

        assert!(matches!(
            appointments(&clinic.scope, &clinic.admin).await,
            Err(ClinicError::NotFound("Patient"))
        ));
    }
}
