//! Appointments of the current clinic, including the double-booking query.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{enum_column, new_id, now};
use crate::entities::{
    Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment, TimeOfDay,
};
use crate::tenancy::ClinicId;
use crate::types::DatabaseResult;

const APPOINTMENT_SELECT: &str = "SELECT a.id, a.clinic_id, a.patient_id, a.doctor_id, a.service_id, \
     a.appointment_date, a.start_time, a.end_time, a.status, a.notes, a.created_at, a.updated_at, \
     pu.first_name || ' ' || pu.last_name AS patient_name, \
     du.first_name || ' ' || du.last_name AS doctor_name, \
     s.name AS service_name \
     FROM appointments a \
     JOIN patients p ON p.id = a.patient_id \
     JOIN users pu ON pu.id = p.user_id \
     JOIN doctors d ON d.id = a.doctor_id \
     JOIN users du ON du.id = d.user_id \
     LEFT JOIN services s ON s.id = a.service_id";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn map_appointment(row: &SqliteRow) -> DatabaseResult<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        patient_id: row.try_get("patient_id")?,
        doctor_id: row.try_get("doctor_id")?,
        service_id: row.try_get("service_id")?,
        appointment_date: row.try_get("appointment_date")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        status: enum_column(row, "status")?,
        notes: row.try_get("notes")?,
        patient_name: row.try_get("patient_name")?,
        doctor_name: row.try_get("doctor_name")?,
        service_name: row.try_get("service_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct AppointmentRepository<'s> {
    clinic_id: &'s ClinicId,
}

impl<'s> AppointmentRepository<'s> {
    pub(crate) fn new(clinic_id: &'s ClinicId) -> Self {
        Self { clinic_id }
    }

    /// Latest appointment date first.
    pub async fn list(
        &self,
        conn: &mut SqliteConnection,
        filter: &AppointmentFilter,
    ) -> DatabaseResult<Vec<Appointment>> {
        let sql = format!(
            "{APPOINTMENT_SELECT} WHERE a.clinic_id = ? \
             AND (? IS NULL OR a.patient_id = ?) AND (? IS NULL OR a.doctor_id = ?) \
             ORDER BY a.appointment_date DESC, a.start_time DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(self.clinic_id.as_str())
            .bind(&filter.patient_id)
            .bind(&filter.patient_id)
            .bind(&filter.doctor_id)
            .bind(&filter.doctor_id)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter().map(map_appointment).collect()
    }

    pub async fn find(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DatabaseResult<Option<Appointment>> {
        let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ? AND a.clinic_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(self.clinic_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(map_appointment).transpose()
    }

    /// First non-cancelled booking for the doctor on that date whose slot
    /// touches `[start, end]`. Boundaries are inclusive: a booking ending at
    /// 09:30 collides with one starting at 09:30.
    pub async fn first_conflict(
        &self,
        conn: &mut SqliteConnection,
        doctor_id: &str,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude_id: Option<&str>,
    ) -> DatabaseResult<Option<String>> {
        // DELETE only marks a booking CANCELLED, so those rows are skipped here;
        // otherwise a cancelled slot could never be booked again.
        let conflict: Option<String> = sqlx::query_scalar(
            "SELECT id FROM appointments WHERE clinic_id = ? AND doctor_id = ? AND appointment_date = ? \
             AND status != 'CANCELLED' AND start_time <= ? AND end_time >= ? \
             AND (? IS NULL OR id != ?) ORDER BY start_time LIMIT 1",
        )
        .bind(self.clinic_id.as_str())
        .bind(doctor_id)
        .bind(date.format(DATE_FORMAT).to_string())
        .bind(end.to_string())
        .bind(start.to_string())
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(conflict)
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        appointment: NewAppointment,
    ) -> DatabaseResult<Appointment> {
        let id = new_id();
        let now = now();

        sqlx::query(
            "INSERT INTO appointments (id, clinic_id, patient_id, doctor_id, service_id, appointment_date, \
             start_time, end_time, status, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.clinic_id.as_str())
        .bind(&appointment.patient_id)
        .bind(&appointment.doctor_id)
        .bind(&appointment.service_id)
        .bind(appointment.date.format(DATE_FORMAT).to_string())
        .bind(appointment.start.to_string())
        .bind(appointment.end.to_string())
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(&appointment.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ?");
        let row = sqlx::query(&sql).bind(&id).fetch_one(&mut *conn).await?;
        map_appointment(&row)
    }

    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        changes: AppointmentChanges,
    ) -> DatabaseResult<Option<Appointment>> {
        let result = sqlx::query(
            "UPDATE appointments SET doctor_id = COALESCE(?, doctor_id), service_id = COALESCE(?, service_id), \
             appointment_date = COALESCE(?, appointment_date), start_time = COALESCE(?, start_time), \
             end_time = COALESCE(?, end_time), status = COALESCE(?, status), notes = COALESCE(?, notes), \
             updated_at = ? WHERE id = ? AND clinic_id = ?",
        )
        .bind(&changes.doctor_id)
        .bind(&changes.service_id)
        .bind(changes.date.map(|date| date.format(DATE_FORMAT).to_string()))
        .bind(changes.start.map(|time| time.to_string()))
        .bind(changes.end.map(|time| time.to_string()))
        .bind(changes.status.map(|status| status.as_str()))
        .bind(&changes.notes)
        .bind(now())
        .bind(id)
        .bind(self.clinic_id.as_str())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find(conn, id).await
    }
}
