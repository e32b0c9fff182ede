//! The clinic's billable services.

use medflow_database::{ClinicScope, NewService, Service, ServiceCategory, ServiceChanges};
use tracing::info;

use crate::error::{ClinicError, ClinicResult};
use crate::models::{CreateServiceRequest, UpdateServiceRequest};
use crate::validation::{non_blank, Validator};

pub async fn list(scope: &ClinicScope) -> ClinicResult<Vec<Service>> {
    let mut conn = scope.acquire().await?;
    Ok(scope.services().list(&mut conn).await?)
}

pub async fn get(scope: &ClinicScope, id: &str) -> ClinicResult<Service> {
    let mut conn = scope.acquire().await?;
    scope
        .services()
        .find(&mut conn, id)
        .await?
        .ok_or(ClinicError::NotFound("Service"))
}

pub async fn create(scope: &ClinicScope, req: CreateServiceRequest) -> ClinicResult<Service> {
    let mut v = Validator::new();
    v.required("name", &req.name)
        .check("price", req.price.is_finite() && req.price >= 0.0, "price must not be negative")
        .check("duration", req.duration >= 0, "duration must not be negative");
    let category: Option<ServiceCategory> =
        v.parse("category", non_blank(req.category).as_deref());
    v.finish()?;

    let mut conn = scope.acquire().await?;
    let service = scope
        .services()
        .insert(
            &mut conn,
            NewService {
                name: req.name.trim().to_string(),
                description: non_blank(req.description),
                price: req.price,
                duration: req.duration,
                category: category.unwrap_or_default(),
                is_active: req.is_active.unwrap_or(true),
            },
        )
        .await?;

    info!(clinic_id = %scope.clinic_id(), service_id = %service.id, name = %service.name, "service created");
    Ok(service)
}

pub async fn update(
    scope: &ClinicScope,
    id: &str,
    req: UpdateServiceRequest,
) -> ClinicResult<Service> {
    let mut v = Validator::new();
    if let Some(name) = &req.name {
        v.required("name", name);
    }
    if let Some(price) = req.price {
        v.check("price", price.is_finite() && price >= 0.0, "price must not be negative");
    }
    if let Some(duration) = req.duration {
        v.check("duration", duration >= 0, "duration must not be negative");
    }
    let category: Option<ServiceCategory> =
        v.parse("category", non_blank(req.category).as_deref());
    v.finish()?;

    let mut conn = scope.acquire().await?;
    scope
        .services()
        .update(
            &mut conn,
            id,
            ServiceChanges {
                name: req.name.map(|name| name.trim().to_string()),
                description: req.description,
                price: req.price,
                duration: req.duration,
                category,
                is_active: req.is_active,
            },
        )
        .await?
        .ok_or(ClinicError::NotFound("Service"))
}

pub async fn delete(scope: &ClinicScope, id: &str) -> ClinicResult<()> {
    let mut conn = scope.acquire().await?;
    if !scope.services().delete(&mut conn, id).await? {
        return Err(ClinicError::NotFound("Service"));
    }
    info!(clinic_id = %scope.clinic_id(), service_id = %id, "service deleted");
    Ok(())
}
