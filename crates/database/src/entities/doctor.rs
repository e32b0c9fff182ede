//! Doctor entity definitions

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub clinic_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub consultation_fee: Option<f64>,
    pub biography: Option<String>,
    pub created_at: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewDoctor {
    pub user_id: String,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub consultation_fee: Option<f64>,
    pub biography: Option<String>,
}
