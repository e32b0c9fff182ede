//! Appointment booking.
//!
//! A doctor cannot hold two non-cancelled appointments on the same date whose
//! time ranges touch or overlap. The check and the write share a transaction.

use chrono::NaiveDate;
use medflow_auth::Principal;
use medflow_database::{
    Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, ClinicScope,
    NewAppointment, Role, TimeOfDay,
};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::own_patient_id;
use crate::validation::{non_blank, parse_date, parse_time, Validator};

pub const CONFLICT_MESSAGE: &str = "Appointment conflict detected";

/// Newest date first. Patients only see their own bookings.
pub async fn list(scope: &ClinicScope, principal: &Principal) -> ClinicResult<Vec<Appointment>> {
    let mut conn = scope.acquire().await?;
    let mut filter = AppointmentFilter::default();

    if principal.role == Role::Patient {
        match own_patient_id(scope, &mut conn, principal).await? {
            Some(patient_id) => filter.patient_id = Some(patient_id),
            None => return Ok(Vec::new()),
        }
    }

    Ok(scope.appointments().list(&mut conn, &filter).await?)
}

pub async fn get(scope: &ClinicScope, principal: &Principal, id: &str) -> ClinicResult<Appointment> {
    let mut conn = scope.acquire().await?;
    let appointment = scope
        .appointments()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Appointment"))?;

    if principal.role == Role::Patient {
        let own = own_patient_id(scope, &mut conn, principal).await?;
        if own.as_deref() != Some(appointment.patient_id.as_str()) {
            return Err(ClinicError::NotFound("Appointment"));
        }
    }

    Ok(appointment)
}

pub async fn create(
    scope: &ClinicScope,
    principal: &Principal,
    req: CreateAppointmentRequest,
) -> ClinicResult<Appointment> {
    let mut v = Validator::new();
    v.required("doctorId", &req.doctor_id)
        .required("appointmentDate", &req.appointment_date)
        .required("startTime", &req.start_time)
        .required("endTime", &req.end_time);
    if principal.role != Role::Patient {
        v.required("patientId", req.patient_id.as_deref().unwrap_or_default());
    }
    v.finish()?;

    let date = parse_date("appointmentDate", &req.appointment_date)?;
    let (start, end) = parse_slot(&req.start_time, &req.end_time)?;

    let mut tx = scope.begin().await?;

    let patient_id = if principal.role == Role::Patient {
        own_patient_id(scope, &mut tx, principal)
            .await?
            .ok_or_else(|| ClinicError::bad_request("Patient not found"))?
    } else {
        let patient_id = req.patient_id.unwrap_or_default();
        if !scope.patients().exists(&mut tx, &patient_id).await? {
            return Err(ClinicError::bad_request("Patient not found"));
        }
        patient_id
    };

    let doctor_id = resolve_doctor(scope, &mut tx, &req.doctor_id).await?;

    let service_id = non_blank(req.service_id);
    if let Some(service_id) = &service_id {
        if scope.services().find(&mut tx, service_id).await?.is_none() {
            return Err(ClinicError::bad_request("Service not found"));
        }
    }

    ensure_free(scope, &mut tx, &doctor_id, date, start, end, None).await?;

    let appointment = scope
        .appointments()
        .insert(
            &mut tx,
            NewAppointment {
                patient_id,
                doctor_id,
                service_id,
                date,
                start,
                end,
                notes: non_blank(req.notes),
            },
        )
        .await?;
    tx.commit().await?;

    info!(
        clinic_id = %scope.clinic_id(),
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        date = %appointment.appointment_date,
        "appointment booked"
    );
    Ok(appointment)
}

/// Partial update. Moving an appointment to another doctor, date or time is
/// checked against the doctor's other bookings.
pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdateAppointmentRequest,
) -> ClinicResult<Appointment> {
    let mut v = Validator::new();
    let status: Option<AppointmentStatus> =
        v.parse("status", non_blank(req.status.clone()).as_deref());
    v.finish()?;

    let date = non_blank(req.appointment_date)
        .map(|raw| parse_date("appointmentDate", &raw))
        .transpose()?;
    let start = non_blank(req.start_time)
        .map(|raw| parse_time("startTime", &raw))
        .transpose()?;
    let end = non_blank(req.end_time)
        .map(|raw| parse_time("endTime", &raw))
        .transpose()?;

    let mut tx = scope.begin().await?;
    let existing = scope
        .appointments()
        .find(&mut tx, id)
        .await?
        .ok_or(ClinicError::NotFound("Appointment"))?;

    let doctor_id = match non_blank(req.doctor_id) {
        Some(reference) => Some(resolve_doctor(scope, &mut tx, &reference).await?),
        None => None,
    };

    let service_id = non_blank(req.service_id);
    if let Some(service_id) = &service_id {
        if scope.services().find(&mut tx, service_id).await?.is_none() {
            return Err(ClinicError::bad_request("Service not found"));
        }
    }

    let moved = doctor_id.is_some() || date.is_some() || start.is_some() || end.is_some();
    let final_status = status.unwrap_or(existing.status);
    if moved && final_status != AppointmentStatus::Cancelled {
        let new_date = match date {
            Some(date) => date,
            None => parse_date("appointmentDate", &existing.appointment_date)?,
        };
        let new_start = match start {
            Some(start) => start,
            None => parse_time("startTime", &existing.start_time)?,
        };
        let new_end = match end {
            Some(end) => end,
            None => parse_time("endTime", &existing.end_time)?,
        };
        if new_end <= new_start {
            return Err(ClinicError::bad_request("endTime must be after startTime"));
        }
        let new_doctor = doctor_id.as_deref().unwrap_or(&existing.doctor_id);
        ensure_free(scope, &mut tx, new_doctor, new_date, new_start, new_end, Some(id)).await?;
    }

    let updated = scope
        .appointments()
        .update(
            &mut tx,
            id,
            AppointmentChanges {
                doctor_id,
                service_id,
                date,
                start,
                end,
                status,
                notes: req.notes,
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Appointment"))?;
    tx.commit().await?;

    info!(clinic_id = %scope.clinic_id(), appointment_id = %id, status = %updated.status, "appointment updated");
    Ok(updated)
}

/// Soft delete: the row stays with status CANCELLED.
pub async fn cancel(scope: &ClinicScope, id: &str) -> ClinicResult<Appointment> {
    let mut conn = scope.acquire().await?;
    let cancelled = scope
        .appointments()
        .update(
            &mut conn,
            id,
            AppointmentChanges {
                status: Some(AppointmentStatus::Cancelled),
                ..AppointmentChanges::default()
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Appointment"))?;

    info!(clinic_id = %scope.clinic_id(), appointment_id = %id, "appointment cancelled");
    Ok(cancelled)
}

fn parse_slot(start: &str, end: &str) -> ClinicResult<(TimeOfDay, TimeOfDay)> {
    let start = parse_time("startTime", start)?;
    let end = parse_time("endTime", end)?;
    if end <= start {
        return Err(ClinicError::bad_request("endTime must be after startTime"));
    }
    Ok((start, end))
}

/// Accepts either a doctor record id or the doctor's user id.
async fn resolve_doctor(
    scope: &ClinicScope,
    conn: &mut SqliteConnection,
    reference: &str,
) -> ClinicResult<String> {
    let doctor = scope
        .doctors()
        .resolve(conn, reference)
        .await?
        .ok_or_else(|| ClinicError::bad_request("Doctor not found"))?;

    if doctor.id != reference {
        warn!(provided = %reference, resolved = %doctor.id, "resolved doctor id from user id");
    }
    Ok(doctor.id)
}

async fn ensure_free(
    scope: &ClinicScope,
    conn: &mut SqliteConnection,
    doctor_id: &str,
    date: NaiveDate,
    start: TimeOfDay,
    end: TimeOfDay,
    exclude: Option<&str>,
) -> ClinicResult<()> {
    if let Some(existing) = scope
        .appointments()
        .first_conflict(conn, doctor_id, date, start, end, exclude)
        .await?
    {
        info!(doctor_id, %date, %start, %end, conflicting = %existing, "appointment conflict");
        return Err(ClinicError::conflict(CONFLICT_MESSAGE));
    }
    Ok(())
}
