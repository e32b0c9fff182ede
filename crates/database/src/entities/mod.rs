//! Domain entities for the database layer
//!
//! Every clinical entity carries the id of the clinic that owns it. Enumerated
//! columns are stored as upper-case text and parsed case-insensitively.

pub mod appointment;
pub mod clinic;
pub mod consultation;
pub mod doctor;
pub mod invoice;
pub mod patient;
pub mod payment;
pub mod prescription;
pub mod schedule;
pub mod service;
pub mod token;
pub mod user;

pub use appointment::{
    Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment,
};
pub use clinic::{Clinic, ClinicChanges, NewClinic};
pub use consultation::{
    Consultation, ConsultationChanges, ConsultationDetail, ConsultationFilter,
    ConsultationStatus, NewConsultation,
};
pub use doctor::{Doctor, NewDoctor};
pub use invoice::{Invoice, InvoiceChanges, InvoiceFilter, InvoiceItem, InvoiceStatus, NewInvoice};
pub use patient::{Gender, NewPatient, Patient, PatientChanges};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentStatus};
pub use prescription::{
    Medication, NewPrescription, Prescription, PrescriptionChanges, PrescriptionFilter,
};
pub use schedule::TimeOfDay;
pub use service::{NewService, Service, ServiceCategory, ServiceChanges};
pub use token::{InviteToken, NewInviteToken, OneTimeToken, PasswordResetToken};
pub use user::{NewUser, Role, User, UserChanges};
