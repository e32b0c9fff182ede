//! Billable service catalogue entries

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::types::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub clinic_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    /// Minutes.
    pub duration: i64,
    pub category: ServiceCategory,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: i64,
    pub category: ServiceCategory,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i64>,
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    #[default]
    Consultation,
    Procedure,
    Diagnostic,
    Therapy,
    Surgery,
    Other,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Consultation => "CONSULTATION",
            ServiceCategory::Procedure => "PROCEDURE",
            ServiceCategory::Diagnostic => "DIAGNOSTIC",
            ServiceCategory::Therapy => "THERAPY",
            ServiceCategory::Surgery => "SURGERY",
            ServiceCategory::Other => "OTHER",
        }
    }
}

impl FromStr for ServiceCategory {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSULTATION" => Ok(ServiceCategory::Consultation),
            "PROCEDURE" => Ok(ServiceCategory::Procedure),
            "DIAGNOSTIC" => Ok(ServiceCategory::Diagnostic),
            "THERAPY" => Ok(ServiceCategory::Therapy),
            "SURGERY" => Ok(ServiceCategory::Surgery),
            "OTHER" => Ok(ServiceCategory::Other),
            _ => Err(DatabaseError::invalid_value("service category", s)),
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
