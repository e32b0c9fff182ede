use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::session,
        crate::routes::auth::create_invite,
        crate::routes::auth::accept_invite,
        crate::routes::auth::request_password_reset,
        crate::routes::auth::confirm_password_reset,
        crate::routes::patients::list_patients,
        crate::routes::patients::create_patient,
        crate::routes::patients::get_patient,
        crate::routes::patients::update_patient,
        crate::routes::patients::delete_patient,
        crate::routes::doctors::list_doctors,
        crate::routes::appointments::list_appointments,
        crate::routes::appointments::create_appointment,
        crate::routes::appointments::get_appointment,
        crate::routes::appointments::update_appointment,
        crate::routes::appointments::cancel_appointment,
        crate::routes::consultations::list_consultations,
        crate::routes::consultations::create_consultation,
        crate::routes::consultations::get_consultation,
        crate::routes::consultations::update_consultation,
        crate::routes::consultations::delete_consultation,
        crate::routes::prescriptions::list_prescriptions,
        crate::routes::prescriptions::create_prescription,
        crate::routes::prescriptions::get_prescription,
        crate::routes::prescriptions::update_prescription,
        crate::routes::prescriptions::delete_prescription,
        crate::routes::prescriptions::prescription_pdf,
        crate::routes::services::list_services,
        crate::routes::services::create_service,
        crate::routes::services::get_service,
        crate::routes::services::update_service,
        crate::routes::services::delete_service,
        crate::routes::invoices::list_invoices,
        crate::routes::invoices::create_invoice,
        crate::routes::invoices::get_invoice,
        crate::routes::invoices::update_invoice,
        crate::routes::payments::create_payment,
        crate::routes::payments::confirm_payment,
        crate::routes::payments::stripe_webhook,
        crate::routes::staff::list_staff,
        crate::routes::staff::invite_staff,
        crate::routes::staff::get_staff,
        crate::routes::staff::update_staff,
        crate::routes::staff::delete_staff,
        crate::routes::settings::get_profile,
        crate::routes::settings::update_profile,
        crate::routes::settings::get_clinic,
        crate::routes::settings::update_clinic,
        crate::routes::portal::my_appointments,
        crate::routes::portal::my_prescriptions,
        crate::routes::portal::my_invoices
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::SessionUser,
            crate::routes::auth::SessionResponse,
            crate::routes::appointments::CancelledAppointment,
            crate::routes::consultations::ConsultationList,
            crate::routes::consultations::ConsultationEnvelope,
            crate::routes::consultations::ConsultationDetailEnvelope,
            medflow_database::Appointment,
            medflow_database::AppointmentStatus,
            medflow_database::Clinic,
            medflow_database::Consultation,
            medflow_database::ConsultationDetail,
            medflow_database::ConsultationStatus,
            medflow_database::Doctor,
            medflow_database::Gender,
            medflow_database::Invoice,
            medflow_database::InvoiceItem,
            medflow_database::InvoiceStatus,
            medflow_database::Medication,
            medflow_database::Patient,
            medflow_database::Payment,
            medflow_database::PaymentMethod,
            medflow_database::PaymentStatus,
            medflow_database::Prescription,
            medflow_database::Role,
            medflow_database::Service,
            medflow_database::ServiceCategory,
            medflow_database::User,
            medflow_clinic::models::RegisterRequest,
            medflow_clinic::models::RegisterResponse,
            medflow_clinic::models::InviteRequest,
            medflow_clinic::models::AcceptInviteRequest,
            medflow_clinic::models::AcceptInviteResponse,
            medflow_clinic::models::PasswordResetRequest,
            medflow_clinic::models::PasswordResetConfirm,
            medflow_clinic::models::OkResponse,
            medflow_clinic::models::CreatePatientRequest,
            medflow_clinic::models::PatientUserUpdate,
            medflow_clinic::models::PatientDetailsUpdate,
            medflow_clinic::models::UpdatePatientRequest,
            medflow_clinic::models::CreateAppointmentRequest,
            medflow_clinic::models::UpdateAppointmentRequest,
            medflow_clinic::models::CreateConsultationRequest,
            medflow_clinic::models::UpdateConsultationRequest,
            medflow_clinic::models::CreatePrescriptionRequest,
            medflow_clinic::models::UpdatePrescriptionRequest,
            medflow_clinic::models::CreateServiceRequest,
            medflow_clinic::models::UpdateServiceRequest,
            medflow_clinic::models::CreateInvoiceRequest,
            medflow_clinic::models::UpdateInvoiceRequest,
            medflow_clinic::models::CreatePaymentRequest,
            medflow_clinic::models::PaymentIntentResponse,
            medflow_clinic::models::ConfirmPaymentRequest,
            medflow_clinic::models::ConfirmPaymentResponse,
            medflow_clinic::models::StaffInviteResponse,
            medflow_clinic::models::UpdateStaffRequest,
            medflow_clinic::models::UpdateProfileRequest,
            medflow_clinic::models::UpdateClinicRequest
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, sessions, invites and password resets"),
        (name = "Patients", description = "Patient records"),
        (name = "Doctors", description = "Doctor directory"),
        (name = "Appointments", description = "Conflict-checked scheduling"),
        (name = "Consultations", description = "Clinical notes per appointment"),
        (name = "Prescriptions", description = "Prescriptions and their PDFs"),
        (name = "Services", description = "Service catalogue"),
        (name = "Invoices", description = "Billing"),
        (name = "Payments", description = "Payment intents and provider webhooks"),
        (name = "Staff", description = "Clinic user management"),
        (name = "Settings", description = "Profile and clinic settings"),
        (name = "Portal", description = "Patient self-service")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Opaque".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
