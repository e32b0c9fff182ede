//! Prescription entity definitions

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub clinic_id: String,
    pub consultation_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub medications: Vec<Medication>,
    pub instructions: Option<String>,
    /// Object-store key of the rendered PDF, absent until rendering succeeds.
    pub pdf_key: Option<String>,
    pub prescription_date: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub consultation_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub medications: Vec<Medication>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PrescriptionChanges {
    pub medications: Option<Vec<Medication>>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PrescriptionFilter {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
}
