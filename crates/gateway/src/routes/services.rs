use axum::{extract::Path, http::StatusCode, Json};
use medflow_clinic::models::{CreateServiceRequest, OkResponse, UpdateServiceRequest};
use medflow_clinic::services::catalog;
use medflow_database::Service;

use crate::extract::ApiJson;
use crate::util::{ADMIN, FRONT_DESK};
use crate::{ApiError, Caller};

#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Services",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Billable services offered by the clinic", body = Vec<Service>)
    )
)]
pub async fn list_services(caller: Caller) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(catalog::list(&caller.scope).await?))
}

#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Services",
    security(("bearerAuth" = [])),
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = Service),
        (status = 400, description = "Invalid payload", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_service(
    caller: Caller,
    ApiJson(req): ApiJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let caller = caller.require(FRONT_DESK)?;
    let service = catalog::create(&caller.scope, req).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    tag = "Services",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service", body = Service),
        (status = 404, description = "Service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_service(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(catalog::get(&caller.scope, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/services/{id}",
    tag = "Services",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Service id")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Updated service", body = Service),
        (status = 404, description = "Service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_service(
    caller: Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    let caller = caller.require(ADMIN)?;
    Ok(Json(catalog::update(&caller.scope, &id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    tag = "Services",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service removed", body = OkResponse),
        (status = 404, description = "Service not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_service(
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller.require(ADMIN)?;
    catalog::delete(&caller.scope, &id).await?;
    Ok(Json(OkResponse::ok()))
}
