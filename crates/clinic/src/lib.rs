//! MedFlow clinic domain
//!
//! Every service function takes a [`medflow_database::ClinicScope`] so reads
//! and writes stay inside the caller's clinic. Outbound side effects (email,
//! file storage, payment provider) are reached through traits so the gateway
//! can swap them for tests.

pub mod error;
pub mod mail;
pub mod models;
pub mod pdf;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{ClinicError, ClinicResult};
pub use mail::{mailer_from_config, EmailMessage, MailError, Mailer, SharedMailer};
pub use storage::{store_from_config, LocalObjectStore, ObjectStore, SharedStore, StorageError};
