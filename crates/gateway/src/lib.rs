//! HTTP surface of MedFlow.
//!
//! Protected handlers take a [`Caller`] extractor, which resolves the bearer
//! session into the tenant scope before any body is read; domain work is delegated to
//! `medflow_clinic::services`. Errors from the lower crates convert into
//! [`ApiError`] and render as `{"error": ..., "details"?: ...}`.

mod docs;
mod error;
mod extract;
mod middleware;
mod state;
mod util;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse, InternalCause, INTERNAL_MESSAGE};
pub use extract::ApiJson;
pub use state::{AppState, Caller};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/auth/invite", post(routes::auth::create_invite))
        .route("/api/auth/invite/accept", post(routes::auth::accept_invite))
        .route(
            "/api/auth/password-reset/request",
            post(routes::auth::request_password_reset),
        )
        .route(
            "/api/auth/password-reset/confirm",
            post(routes::auth::confirm_password_reset),
        )
        .route(
            "/api/auth/password-reset/accept",
            post(routes::auth::confirm_password_reset),
        )
        // Patients and doctors
        .route(
            "/api/patients",
            get(routes::patients::list_patients).post(routes::patients::create_patient),
        )
        .route(
            "/api/patients/:id",
            get(routes::patients::get_patient)
                .put(routes::patients::update_patient)
                .delete(routes::patients::delete_patient),
        )
        .route("/api/doctors", get(routes::doctors::list_doctors))
        // Scheduling
        .route(
            "/api/appointments",
            get(routes::appointments::list_appointments)
                .post(routes::appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(routes::appointments::get_appointment)
                .patch(routes::appointments::update_appointment)
                .delete(routes::appointments::cancel_appointment),
        )
        // Clinical records
        .route(
            "/api/consultations",
            get(routes::consultations::list_consultations)
                .post(routes::consultations::create_consultation),
        )
        .route(
            "/api/consultations/:id",
            get(routes::consultations::get_consultation)
                .patch(routes::consultations::update_consultation)
                .delete(routes::consultations::delete_consultation),
        )
        .route(
            "/api/prescriptions",
            get(routes::prescriptions::list_prescriptions)
                .post(routes::prescriptions::create_prescription),
        )
        .route(
            "/api/prescriptions/:id",
            get(routes::prescriptions::get_prescription)
                .patch(routes::prescriptions::update_prescription)
                .delete(routes::prescriptions::delete_prescription),
        )
        .route(
            "/api/prescriptions/:id/pdf",
            get(routes::prescriptions::prescription_pdf),
        )
        // Catalogue and billing
        .route(
            "/api/services",
            get(routes::services::list_services).post(routes::services::create_service),
        )
        .route(
            "/api/services/:id",
            get(routes::services::get_service)
                .put(routes::services::update_service)
                .delete(routes::services::delete_service),
        )
        .route(
            "/api/invoices",
            get(routes::invoices::list_invoices).post(routes::invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(routes::invoices::get_invoice).patch(routes::invoices::update_invoice),
        )
        .route("/api/payments", post(routes::payments::create_payment))
        .route("/api/payments/confirm", post(routes::payments::confirm_payment))
        .route("/api/webhooks/stripe", post(routes::payments::stripe_webhook))
        // Administration
        .route(
            "/api/staff",
            get(routes::staff::list_staff).post(routes::staff::invite_staff),
        )
        .route(
            "/api/staff/:id",
            get(routes::staff::get_staff)
                .put(routes::staff::update_staff)
                .delete(routes::staff::delete_staff),
        )
        .route(
            "/api/settings/profile",
            get(routes::settings::get_profile).put(routes::settings::update_profile),
        )
        .route(
            "/api/settings/clinic",
            get(routes::settings::get_clinic).put(routes::settings::update_clinic),
        )
        .route(
            "/api/clinic",
            get(routes::settings::get_clinic).put(routes::settings::update_clinic),
        )
        // Patient portal
        .route(
            "/api/portal/appointments",
            get(routes::portal::my_appointments),
        )
        .route(
            "/api/portal/prescriptions",
            get(routes::portal::my_prescriptions),
        )
        .route("/api/portal/invoices", get(routes::portal::my_invoices));

    #[cfg(debug_assertions)]
    let router = {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    };

    router
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::reveal_internal_errors,
        ))
        .with_state(state)
        .layer(cors_layer())
        .layer(middleware::trace_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
