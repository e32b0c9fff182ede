use axum::http::HeaderMap;
use medflow_auth::{AuthSession, Authenticator, Principal};
use medflow_clinic::{SharedMailer, SharedStore};
use medflow_database::{ClinicScope, Role, Tenancy};
use medflow_payments::{SharedGateway, WebhookVerifier};

use crate::util::require_bearer;
use crate::ApiError;

/// An authenticated request: who is calling and the clinic they may touch.
pub struct Caller {
    pub principal: Principal,
    pub scope: ClinicScope,
}

impl Caller {
    pub fn require(self, roles: &[Role]) -> Result<Self, ApiError> {
        self.principal.require_role(roles)?;
        Ok(self)
    }
}

#[derive(Clone)]
pub struct AppState {
    tenancy: Tenancy,
    authenticator: Authenticator,
    mailer: SharedMailer,
    store: SharedStore,
    payments: SharedGateway,
    webhooks: WebhookVerifier,
    public_url: String,
    expose_internal_errors: bool,
}

impl AppState {
    pub fn new(
        tenancy: Tenancy,
        authenticator: Authenticator,
        mailer: SharedMailer,
        store: SharedStore,
        payments: SharedGateway,
        webhooks: WebhookVerifier,
    ) -> Self {
        Self {
            tenancy,
            authenticator,
            mailer,
            store,
            payments,
            webhooks,
            public_url: "http://localhost:3000".to_string(),
            expose_internal_errors: false,
        }
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into();
        self
    }

    pub fn with_internal_errors_exposed(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub fn tenancy(&self) -> &Tenancy {
        &self.tenancy
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn mailer(&self) -> &SharedMailer {
        &self.mailer
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn payments(&self) -> &SharedGateway {
        &self.payments
    }

    pub fn webhooks(&self) -> &WebhookVerifier {
        &self.webhooks
    }

    /// Base URL of the web application, used for links in emails.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn expose_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }

    pub async fn session(&self, headers: &HeaderMap) -> Result<(Principal, AuthSession), ApiError> {
        let token = require_bearer(headers)?;
        self.authenticator
            .authenticate_token(&token)
            .await
            .map_err(ApiError::from)
    }

    /// Resolve the bearer session into a [`Caller`] scoped to its clinic.
    pub async fn caller(&self, headers: &HeaderMap) -> Result<Caller, ApiError> {
        let (principal, _) = self.session(headers).await?;
        let scope = self.tenancy.scope(principal.clinic_id.clone());
        Ok(Caller { principal, scope })
    }
}
