use std::sync::Mutex;

use async_trait::async_trait;
use medflow_auth::{Authenticator, Principal};
use medflow_clinic::models::{
    AcceptInviteRequest, InviteRequest, PasswordResetConfirm, RegisterRequest,
};
use medflow_clinic::services::{onboarding, staff};
use medflow_clinic::{ClinicError, EmailMessage, MailError, Mailer};
use medflow_config::{AuthConfig, DatabaseConfig};
use medflow_database::{initialize_database, ClinicId, Role, Tenancy};
use tempfile::TempDir;

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<EmailMessage>>,
}

impl Outbox {
    fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let text = &sent.last().expect("an email was sent").text;
        let start = text.find("token=").expect("link with token") + "token=".len();
        text[start..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

async fn setup() -> (Tenancy, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("flows.db").display()),
        max_connections: 5,
        rls_session_variable: false,
    };
    let pool = initialize_database(&config).await.unwrap();
    (Tenancy::new(pool, false), dir)
}

async fn register_admin(tenancy: &Tenancy) -> Principal {
    let registered = onboarding::register(
        tenancy,
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "ada@sunrise.test".into(),
            password: "password123".into(),
            phone: None,
            clinic_name: "Sunrise Clinic".into(),
        },
    )
    .await
    .unwrap();

    Principal {
        user_id: registered.user_id,
        clinic_id: ClinicId::new(registered.clinic_id).unwrap(),
        role: Role::Admin,
        email: "ada@sunrise.test".into(),
        first_name: "Ada".into(),
        last_name: "Admin".into(),
        clinic_name: "Sunrise Clinic".into(),
    }
}

#[tokio::test]
async fn invite_can_be_accepted_once() {
    let (tenancy, _dir) = setup().await;
    let admin = register_admin(&tenancy).await;
    let scope = tenancy.scope(admin.clinic_id.clone());
    let outbox = Outbox::default();

    staff::invite(
        &scope,
        &admin,
        &outbox,
        "http://app.test",
        InviteRequest {
            email: "gp@sunrise.test".into(),
            role: "DOCTOR".into(),
        },
    )
    .await
    .unwrap();
    let token = outbox.last_token();

    let accept = || AcceptInviteRequest {
        token: token.clone(),
        first_name: "Greg".into(),
        last_name: "House".into(),
        password: "secret99".into(),
    };

    let accepted = onboarding::accept_invite(&tenancy, accept()).await.unwrap();
    assert!(accepted.ok);

    let err = onboarding::accept_invite(&tenancy, accept()).await.unwrap_err();
    assert!(matches!(err, ClinicError::BadRequest(msg) if msg == "Invalid or expired invite"));

    let mut conn = scope.acquire().await.unwrap();
    let doctor = scope
        .doctors()
        .find_by_user(&mut conn, &accepted.user_id)
        .await
        .unwrap();
    assert!(doctor.is_some(), "doctor invites create a doctor record");
}

#[tokio::test]
async fn password_reset_token_is_single_use() {
    let (tenancy, _dir) = setup().await;
    register_admin(&tenancy).await;
    let outbox = Outbox::default();

    onboarding::request_password_reset(&tenancy, &outbox, "http://app.test/", Some("ADA@sunrise.test"))
        .await;
    assert_eq!(outbox.count(), 1);
    let token = outbox.last_token();

    let confirm = || PasswordResetConfirm {
        token: token.clone(),
        password: "brand-new-pass".into(),
    };
    onboarding::confirm_password_reset(&tenancy, confirm()).await.unwrap();

    let err = onboarding::confirm_password_reset(&tenancy, confirm())
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::BadRequest(msg) if msg == "Invalid or expired token"));

    let auth = Authenticator::new(tenancy.pool().clone(), &AuthConfig::default());
    assert!(auth.login("ada@sunrise.test", "password123").await.is_err());
    let (principal, _session) = auth.login("ada@sunrise.test", "brand-new-pass").await.unwrap();
    assert_eq!(principal.clinic_name, "Sunrise Clinic");
}
