//! Tenant scoping.
//!
//! Clinical data is only reachable through a [`ClinicScope`]. The scope owns
//! the clinic id and hands out repositories that bind it into every statement,
//! so a row that belongs to another clinic looks exactly like a missing row.

use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::repos::{
    AppointmentRepository, ClinicRepository, ConsultationRepository, DoctorRepository,
    InviteRepository, InvoiceRepository, PatientRepository, PaymentRepository,
    PrescriptionRepository, ServiceRepository, StaffRepository,
};
use crate::types::{DatabaseError, DatabaseResult};

/// Identifier of the clinic (tenant) that owns a piece of data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicId(String);

impl ClinicId {
    pub fn new(value: impl Into<String>) -> DatabaseResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DatabaseError::MissingClinicId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data access bound to a single clinic.
#[derive(Clone)]
pub struct ClinicScope {
    pool: SqlitePool,
    clinic_id: ClinicId,
    session_variable: bool,
}

impl ClinicScope {
    pub fn new(pool: SqlitePool, clinic_id: ClinicId) -> Self {
        Self {
            pool,
            clinic_id,
            session_variable: false,
        }
    }

    /// Also publish the clinic id as `medflow.current_clinic` inside transactions,
    /// for databases that enforce row-level security policies.
    pub fn with_session_variable(mut self, enabled: bool) -> Self {
        self.session_variable = enabled;
        self
    }

    pub fn clinic_id(&self) -> &ClinicId {
        &self.clinic_id
    }

    pub async fn acquire(&self) -> DatabaseResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a transaction for a multi-step write.
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await?;
        if self.session_variable {
            set_session_clinic(&mut tx, &self.clinic_id).await;
        }
        Ok(tx)
    }

    pub fn clinic(&self) -> ClinicRepository<'_> {
        ClinicRepository::new(&self.clinic_id)
    }

    pub fn staff(&self) -> StaffRepository<'_> {
        StaffRepository::new(&self.clinic_id)
    }

    pub fn patients(&self) -> PatientRepository<'_> {
        PatientRepository::new(&self.clinic_id)
    }

    pub fn doctors(&self) -> DoctorRepository<'_> {
        DoctorRepository::new(&self.clinic_id)
    }

    pub fn services(&self) -> ServiceRepository<'_> {
        ServiceRepository::new(&self.clinic_id)
    }

    pub fn appointments(&self) -> AppointmentRepository<'_> {
        AppointmentRepository::new(&self.clinic_id)
    }

    pub fn consultations(&self) -> ConsultationRepository<'_> {
        ConsultationRepository::new(&self.clinic_id)
    }

    pub fn prescriptions(&self) -> PrescriptionRepository<'_> {
        PrescriptionRepository::new(&self.clinic_id)
    }

    pub fn invoices(&self) -> InvoiceRepository<'_> {
        InvoiceRepository::new(&self.clinic_id)
    }

    pub fn payments(&self) -> PaymentRepository<'_> {
        PaymentRepository::new(&self.clinic_id)
    }

    pub fn invites(&self) -> InviteRepository<'_> {
        InviteRepository::new(&self.clinic_id)
    }
}

/// Hands out scopes for a known clinic id.
///
/// Request handlers get their clinic from the session. Flows that start without
/// one (registration, invite acceptance, webhooks) resolve the id first and
/// then ask for a scope here.
#[derive(Clone)]
pub struct Tenancy {
    pool: SqlitePool,
    session_variable: bool,
}

impl Tenancy {
    pub fn new(pool: SqlitePool, session_variable: bool) -> Self {
        Self {
            pool,
            session_variable,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn scope(&self, clinic_id: ClinicId) -> ClinicScope {
        ClinicScope::new(self.pool.clone(), clinic_id).with_session_variable(self.session_variable)
    }
}

/// Set once `set_config` has failed; the backend will not grow it later.
static SESSION_VARIABLE_UNAVAILABLE: AtomicBool = AtomicBool::new(false);

/// Best effort: application-level scoping still applies. SQLite has no
/// `set_config`, so there the first transaction logs a warning and later ones
/// skip the statement.
async fn set_session_clinic(conn: &mut SqliteConnection, clinic_id: &ClinicId) {
    if SESSION_VARIABLE_UNAVAILABLE.load(Ordering::Relaxed) {
        return;
    }

    let result = sqlx::query("SELECT set_config('medflow.current_clinic', ?, true)")
        .bind(clinic_id.as_str())
        .execute(&mut *conn)
        .await;

    if let Err(error) = result {
        if !SESSION_VARIABLE_UNAVAILABLE.swap(true, Ordering::Relaxed) {
            warn!(
                clinic_id = %clinic_id,
                %error,
                "clinic session variable unsupported by this database, relying on scoped queries"
            );
        }
    }
}

/// Whether scoped transactions still attempt to publish the clinic session variable.
pub fn session_variable_available() -> bool {
    !SESSION_VARIABLE_UNAVAILABLE.load(Ordering::Relaxed)
}

/// Resolve which clinic owns the payment created for a Stripe payment intent.
///
/// Webhook deliveries carry no session, so this is the one lookup that runs
/// before a scope exists.
pub async fn clinic_for_payment_intent(
    pool: &SqlitePool,
    payment_intent_id: &str,
) -> DatabaseResult<Option<ClinicId>> {
    let clinic_id: Option<String> =
        sqlx::query_scalar("SELECT clinic_id FROM payments WHERE stripe_payment_intent_id = ?")
            .bind(payment_intent_id)
            .fetch_optional(pool)
            .await?;

    clinic_id.map(ClinicId::new).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clinic_id_rejects_blank_values() {
        assert!(matches!(ClinicId::new(""), Err(DatabaseError::MissingClinicId)));
        assert!(matches!(ClinicId::new("   "), Err(DatabaseError::MissingClinicId)));
        assert_eq!(ClinicId::new("clinic-1").unwrap().as_str(), "clinic-1");
    }
}
