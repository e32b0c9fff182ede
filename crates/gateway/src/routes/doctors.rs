use axum::Json;
use medflow_clinic::services::doctors;
use medflow_database::Doctor;

use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/doctors",
    tag = "Doctors",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Doctors of the caller's clinic with their names", body = Vec<Doctor>),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_doctors(caller: Caller) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(doctors::list(&caller.scope).await?))
}
