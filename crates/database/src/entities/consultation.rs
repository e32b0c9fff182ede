//! Consultation entity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::prescription::Prescription;
use crate::types::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: String,
    pub clinic_id: String,
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub chief_complaint: String,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub vital_signs: Option<serde_json::Value>,
    pub consultation_date: String,
    pub status: ConsultationStatus,
    pub patient_name: String,
    pub doctor_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A consultation together with the prescriptions written during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationDetail {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub prescriptions: Vec<Prescription>,
}

#[derive(Debug, Clone)]
pub struct NewConsultation {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub chief_complaint: String,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub vital_signs: Option<serde_json::Value>,
    pub consultation_date: String,
    pub status: ConsultationStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ConsultationChanges {
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub vital_signs: Option<serde_json::Value>,
    pub status: Option<ConsultationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ConsultationFilter {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub status: Option<ConsultationStatus>,
}

/// Stored upper-case, exposed lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Scheduled => "SCHEDULED",
            ConsultationStatus::Completed => "COMPLETED",
            ConsultationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for ConsultationStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(ConsultationStatus::Scheduled),
            "COMPLETED" => Ok(ConsultationStatus::Completed),
            "CANCELLED" => Ok(ConsultationStatus::Cancelled),
            _ => Err(DatabaseError::invalid_value("consultation status", s)),
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
