//! Database repository implementations
//!
//! Scoped repositories are created by [`crate::ClinicScope`] and take the
//! connection to run on, so the same code serves plain reads and transactions.

pub mod accounts;
pub mod appointment_repository;
pub mod clinic_repository;
pub mod consultation_repository;
pub mod doctor_repository;
pub mod invoice_repository;
pub mod patient_repository;
pub mod payment_repository;
pub mod prescription_repository;
pub mod service_repository;
pub mod staff_repository;
pub mod token_repository;

pub use appointment_repository::AppointmentRepository;
pub use clinic_repository::ClinicRepository;
pub use consultation_repository::ConsultationRepository;
pub use doctor_repository::DoctorRepository;
pub use invoice_repository::InvoiceRepository;
pub use patient_repository::PatientRepository;
pub use payment_repository::PaymentRepository;
pub use prescription_repository::PrescriptionRepository;
pub use service_repository::ServiceRepository;
pub use staff_repository::StaffRepository;
pub use token_repository::InviteRepository;

use chrono::{DateTime, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use crate::types::{DatabaseError, DatabaseResult};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

pub(crate) fn new_id() -> String {
    CUID.create_id()
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn enum_column<T>(row: &SqliteRow, column: &str) -> DatabaseResult<T>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
}

pub(crate) fn optional_enum_column<T>(row: &SqliteRow, column: &str) -> DatabaseResult<Option<T>>
where
    T: FromStr<Err = DatabaseError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| value.parse()).transpose()
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> DatabaseResult<T> {
    let raw: String = row.try_get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn optional_json_column<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> DatabaseResult<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| serde_json::from_str(&value))
        .transpose()
        .map_err(DatabaseError::from)
}

pub(crate) fn timestamp_column(row: &SqliteRow, column: &str) -> DatabaseResult<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| DatabaseError::invalid_value("timestamp", raw))
}
