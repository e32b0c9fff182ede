use std::collections::BTreeMap;

use medflow_auth::AuthError;
use medflow_database::DatabaseError;
use medflow_payments::PaymentError;
use thiserror::Error;

use crate::mail::MailError;
use crate::storage::StorageError;

pub type ClinicResult<T> = Result<T, ClinicError>;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    Conflict(String),
    #[error("Forbidden")]
    Forbidden,
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("email delivery failed: {0}")]
    Email(#[from] MailError),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("pdf rendering failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("{0}")]
    Internal(String),
}

impl ClinicError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ClinicError::NotFound("Patient").to_string(), "Patient not found");
    }

    #[test]
    fn forbidden_auth_error_is_preserved() {
        let err = ClinicError::from(AuthError::Forbidden);
        assert!(matches!(err, ClinicError::Auth(AuthError::Forbidden)));
        assert_eq!(err.to_string(), "Forbidden");
    }
}
