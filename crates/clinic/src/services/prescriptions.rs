//! Prescriptions and their PDF copies.
//!
//! The PDF is rendered and uploaded after the prescription row commits. Any
//! failure there is logged and leaves `pdf_key` empty.

use bytes::Bytes;
use chrono::Utc;
use medflow_auth::Principal;
use medflow_database::{
    ClinicScope, Medication, NewPrescription, Prescription, PrescriptionChanges,
    PrescriptionFilter, Role,
};
use rand::Rng;
use tracing::{error, info};

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreatePrescriptionRequest, UpdatePrescriptionRequest};
use crate::pdf::TextPage;
use crate::services::own_patient_id;
use crate::storage::ObjectStore;
use crate::validation::{non_blank, Validator};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Default)]
pub struct PrescriptionQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
}

pub async fn list(scope: &ClinicScope, query: PrescriptionQuery) -> ClinicResult<Vec<Prescription>> {
    let filter = PrescriptionFilter {
        patient_id: non_blank(query.patient_id),
        doctor_id: non_blank(query.doctor_id),
    };
    let mut conn = scope.acquire().await?;
    Ok(scope.prescriptions().list(&mut conn, &filter).await?)
}

/// Patients may only read their own prescriptions.
pub async fn get(scope: &ClinicScope, principal: &Principal, id: &str) -> ClinicResult<Prescription> {
    let mut conn = scope.acquire().await?;
    let prescription = scope
        .prescriptions()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Prescription"))?;

    if principal.role == Role::Patient {
        let own = own_patient_id(scope, &mut conn, principal).await?;
        if own.as_deref() != Some(prescription.patient_id.as_str()) {
            return Err(ClinicError::NotFound("Prescription"));
        }
    }

    Ok(prescription)
}

pub async fn create(
    scope: &ClinicScope,
    principal: &Principal,
    store: &dyn ObjectStore,
    req: CreatePrescriptionRequest,
) -> ClinicResult<Prescription> {
    let mut v = Validator::new();
    v.required("consultationId", &req.consultation_id)
        .required("patientId", &req.patient_id)
        .check(
            "medications",
            !req.medications.is_empty(),
            "At least one medication is required",
        );
    for (index, medication) in req.medications.iter().enumerate() {
        v.required(&format!("medications.{index}.name"), &medication.name);
    }
    v.finish()?;

    let mut tx = scope.begin().await?;

    let doctor_id = match non_blank(req.doctor_id) {
        Some(reference) => scope
            .doctors()
            .resolve(&mut tx, &reference)
            .await?
            .map(|doctor| doctor.id),
        None => scope
            .doctors()
            .find_by_user(&mut tx, &principal.user_id)
            .await?
            .map(|doctor| doctor.id),
    }
    .ok_or_else(|| ClinicError::bad_request("Doctor ID could not be resolved"))?;

    if scope
        .consultations()
        .find(&mut tx, &req.consultation_id)
        .await?
        .is_none()
    {
        return Err(ClinicError::bad_request("Consultation not found"));
    }
    if !scope.patients().exists(&mut tx, &req.patient_id).await? {
        return Err(ClinicError::bad_request("Patient not found"));
    }

    let mut prescription = scope
        .prescriptions()
        .insert(
            &mut tx,
            NewPrescription {
                consultation_id: req.consultation_id,
                patient_id: req.patient_id,
                doctor_id,
                medications: req.medications,
                instructions: non_blank(req.instructions),
            },
        )
        .await?;
    tx.commit().await?;

    info!(
        clinic_id = %scope.clinic_id(),
        prescription_id = %prescription.id,
        "prescription created"
    );

    match attach_pdf(scope, store, &prescription).await {
        Ok(key) => prescription.pdf_key = Some(key),
        Err(err) => {
            error!(prescription_id = %prescription.id, error = %err, "failed to generate prescription pdf")
        }
    }

    Ok(prescription)
}

async fn attach_pdf(
    scope: &ClinicScope,
    store: &dyn ObjectStore,
    prescription: &Prescription,
) -> ClinicResult<String> {
    let document = prescription_pdf(prescription)?;
    let key = pdf_key();
    store.put(&key, Bytes::from(document), PDF_CONTENT_TYPE).await?;

    let mut conn = scope.acquire().await?;
    if !scope
        .prescriptions()
        .set_pdf_key(&mut conn, &prescription.id, &key)
        .await?
    {
        return Err(ClinicError::internal("prescription disappeared before its pdf was saved"));
    }
    Ok(key)
}

fn pdf_key() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!(
        "prescriptions/prescription-{}-{suffix}.pdf",
        Utc::now().timestamp_millis()
    )
}

/// Lay out a prescription on a single A4 page.
pub fn prescription_pdf(prescription: &Prescription) -> ClinicResult<Vec<u8>> {
    let mut page = TextPage::new();
    page.text(14.0, 10.0, 20.0, format!("Prescription - {}", prescription.id))
        .text(11.0, 10.0, 32.0, format!("Patient ID: {}", prescription.patient_id))
        .text(
            11.0,
            10.0,
            40.0,
            format!("Consultation ID: {}", prescription.consultation_id),
        );

    let mut y = 54.0;
    for (index, medication) in prescription.medications.iter().enumerate() {
        page.text(11.0, 10.0, y, medication_line(index + 1, medication));
        y += 8.0;
        if let Some(notes) = &medication.notes {
            page.text(11.0, 10.0, y, format!("   Notes: {notes}"));
            y += 8.0;
        }
    }

    if let Some(instructions) = &prescription.instructions {
        page.text(11.0, 10.0, y + 4.0, "Doctor notes:")
            .text(11.0, 10.0, y + 12.0, instructions.as_str());
    }

    Ok(page.render()?)
}

fn medication_line(number: usize, medication: &Medication) -> String {
    let mut line = format!("{number}. {}", medication.name);
    for part in [&medication.dosage, &medication.frequency, &medication.duration]
        .into_iter()
        .flatten()
    {
        line.push_str(" - ");
        line.push_str(part);
    }
    line
}

pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdatePrescriptionRequest,
) -> ClinicResult<Prescription> {
    if let Some(medications) = &req.medications {
        let mut v = Validator::new();
        v.check(
            "medications",
            !medications.is_empty(),
            "At least one medication is required",
        );
        v.finish()?;
    }

    let mut conn = scope.acquire().await?;
    scope
        .prescriptions()
        .update(
            &mut conn,
            id,
            PrescriptionChanges {
                medications: req.medications,
                instructions: req.instructions,
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Prescription"))
}

pub async fn delete(scope: &ClinicScope, id: &str) -> ClinicResult<()> {
    let mut conn = scope.acquire().await?;
    if !scope.prescriptions().delete(&mut conn, id).await? {
        return Err(ClinicError::NotFound("Prescription"));
    }
    info!(clinic_id = %scope.clinic_id(), prescription_id = %id, "prescription deleted");
    Ok(())
}

/// A stored PDF ready to stream.
#[derive(Debug, Clone)]
pub struct PrescriptionDocument {
    pub filename: String,
    pub body: Bytes,
}

pub async fn pdf(
    scope: &ClinicScope,
    principal: &Principal,
    store: &dyn ObjectStore,
    id: &str,
) -> ClinicResult<PrescriptionDocument> {
    let prescription = get(scope, principal, id).await?;
    let key = prescription.pdf_key.ok_or(ClinicError::NotFound("Prescription PDF"))?;
    let body = store
        .get(&key)
        .await?
        .ok_or(ClinicError::NotFound("Prescription PDF"))?;

    Ok(PrescriptionDocument {
        filename: format!("prescription-{}.pdf", prescription.id),
        body,
    })
}
