pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod doctors;
pub mod health;
pub mod invoices;
pub mod patients;
pub mod payments;
pub mod portal;
pub mod prescriptions;
pub mod services;
pub mod settings;
pub mod staff;
