use medflow_database::{ClinicScope, Doctor};

use crate::error::ClinicResult;

/// Active doctors of the clinic, ordered by name.
pub async fn list(scope: &ClinicScope) -> ClinicResult<Vec<Doctor>> {
    let mut conn = scope.acquire().await?;
    Ok(scope.doctors().list(&mut conn).await?)
}
