use medflow_database::{
    ClinicScope, Consultation, ConsultationChanges, ConsultationDetail, ConsultationFilter,
    ConsultationStatus, NewConsultation,
};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreateConsultationRequest, UpdateConsultationRequest};
use crate::validation::{non_blank, Validator};

/// Query-string filters as received. `status` is matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ConsultationQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<String>,
}

pub async fn list(scope: &ClinicScope, query: ConsultationQuery) -> ClinicResult<Vec<Consultation>> {
    let mut v = Validator::new();
    let status: Option<ConsultationStatus> = v.parse("status", non_blank(query.status).as_deref());
    v.finish()?;

    let filter = ConsultationFilter {
        patient_id: non_blank(query.patient_id),
        doctor_id: non_blank(query.doctor_id),
        status,
    };

    let mut conn = scope.acquire().await?;
    Ok(scope.consultations().list(&mut conn, &filter).await?)
}

/// The consultation together with the prescriptions written during it.
pub async fn get(scope: &ClinicScope, id: &str) -> ClinicResult<ConsultationDetail> {
    let mut conn = scope.acquire().await?;
    let consultation = scope
        .consultations()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Consultation"))?;
    let prescriptions = scope
        .prescriptions()
        .list_for_consultation(&mut conn, id)
        .await?;

    Ok(ConsultationDetail {
        consultation,
        prescriptions,
    })
}

/// One consultation per appointment. Patient and doctor default to the
/// appointment's.
pub async fn create(
    scope: &ClinicScope,
    req: CreateConsultationRequest,
) -> ClinicResult<Consultation> {
    let mut v = Validator::new();
    v.required("appointmentId", &req.appointment_id)
        .required("chiefComplaint", &req.chief_complaint);
    let status: Option<ConsultationStatus> = v.parse("status", non_blank(req.status).as_deref());
    v.finish()?;

    let mut tx = scope.begin().await?;
    let appointment = scope
        .appointments()
        .find(&mut tx, &req.appointment_id)
        .await?
        .ok_or(ClinicError::NotFound("Appointment"))?;

    if scope
        .consultations()
        .exists_for_appointment(&mut tx, &appointment.id)
        .await?
    {
        return Err(ClinicError::bad_request(
            "A consultation already exists for this appointment",
        ));
    }

    let patient_id = non_blank(req.patient_id).unwrap_or_else(|| appointment.patient_id.clone());
    if !scope.patients().exists(&mut tx, &patient_id).await? {
        return Err(ClinicError::bad_request("Patient not found"));
    }

    let doctor_id = match non_blank(req.doctor_id) {
        Some(reference) => {
            scope
                .doctors()
                .resolve(&mut tx, &reference)
                .await?
                .ok_or_else(|| ClinicError::bad_request("Doctor not found"))?
                .id
        }
        None => appointment.doctor_id.clone(),
    };

    let consultation = scope
        .consultations()
        .insert(
            &mut tx,
            NewConsultation {
                appointment_id: appointment.id.clone(),
                patient_id,
                doctor_id,
                chief_complaint: req.chief_complaint.trim().to_string(),
                diagnosis: non_blank(req.diagnosis),
                notes: non_blank(req.notes),
                vital_signs: req.vital_signs,
                consultation_date: format!(
                    "{}T{}:00",
                    appointment.appointment_date, appointment.start_time
                ),
                status: status.unwrap_or(ConsultationStatus::Scheduled),
            },
        )
        .await?;
    tx.commit().await?;

    info!(
        clinic_id = %scope.clinic_id(),
        consultation_id = %consultation.id,
        appointment_id = %appointment.id,
        "consultation created"
    );
    Ok(consultation)
}

pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdateConsultationRequest,
) -> ClinicResult<Consultation> {
    let mut v = Validator::new();
    let status: Option<ConsultationStatus> = v.parse("status", non_blank(req.status).as_deref());
    if let Some(complaint) = &req.chief_complaint {
        v.required("chiefComplaint", complaint);
    }
    v.finish()?;

    let mut conn = scope.acquire().await?;
    scope
        .consultations()
        .update(
            &mut conn,
            id,
            ConsultationChanges {
                chief_complaint: req.chief_complaint,
                diagnosis: req.diagnosis,
                notes: req.notes,
                vital_signs: req.vital_signs,
                status,
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Consultation"))
}

/// Prescriptions written during the consultation are removed with it.
pub async fn delete(scope: &ClinicScope, id: &str) -> ClinicResult<()> {
    let mut conn = scope.acquire().await?;
    if !scope.consultations().delete(&mut conn, id).await? {
        return Err(ClinicError::NotFound("Consultation"));
    }
    info!(clinic_id = %scope.clinic_id(), consultation_id = %id, "consultation deleted");
    Ok(())
}
