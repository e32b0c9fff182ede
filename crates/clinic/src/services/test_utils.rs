use std::sync::Mutex;

use async_trait::async_trait;
use medflow_auth::Principal;
use medflow_config::DatabaseConfig;
use medflow_database::{
    accounts, initialize_database, ClinicId, ClinicScope, NewClinic, NewDoctor, NewPatient,
    NewUser, Role, Tenancy, User,
};
use tempfile::TempDir;

use crate::mail::{EmailMessage, MailError, Mailer};

pub async fn create_test_db() -> (Tenancy, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("clinic.db").display()),
        max_connections: 5,
        rls_session_variable: false,
    };
    let pool = initialize_database(&config).await.expect("database");
    (Tenancy::new(pool, false), dir)
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock").push(message);
        Ok(())
    }
}

/// A clinic with one user per role plus the patient and doctor records.
pub struct TestClinic {
    pub scope: ClinicScope,
    pub admin: Principal,
    pub doctor: Principal,
    pub receptionist: Principal,
    pub patient: Principal,
    pub doctor_id: String,
    pub patient_id: String,
}

pub async fn seed_clinic(tenancy: &Tenancy, name: &str) -> TestClinic {
    let mut conn = tenancy.pool().acquire().await.unwrap();
    let clinic = accounts::create_clinic(
        &mut conn,
        NewClinic {
            name: name.to_string(),
            email: None,
            phone: None,
        },
    )
    .await
    .unwrap();
    let scope = tenancy.scope(ClinicId::new(clinic.id.clone()).unwrap());
    let slug = name.to_lowercase().replace(' ', "-");

    let add = |role: Role| {
        let email = format!("{}@{slug}.test", role.as_str().to_lowercase());
        NewUser {
            email,
            password_hash: medflow_auth::hash_password("password123").unwrap(),
            first_name: role.as_str().to_string(),
            last_name: "Tester".to_string(),
            phone: None,
            role,
            email_verified: true,
        }
    };

    let admin = scope.staff().insert(&mut conn, add(Role::Admin)).await.unwrap();
    let doctor = scope.staff().insert(&mut conn, add(Role::Doctor)).await.unwrap();
    let receptionist = scope.staff().insert(&mut conn, add(Role::Receptionist)).await.unwrap();
    let patient = scope.staff().insert(&mut conn, add(Role::Patient)).await.unwrap();

    let doctor_record = scope
        .doctors()
        .insert(
            &mut conn,
            NewDoctor {
                user_id: doctor.id.clone(),
                specialization: Some("General Practice".into()),
                ..NewDoctor::default()
            },
        )
        .await
        .unwrap();
    let patient_record = scope
        .patients()
        .insert(
            &mut conn,
            NewPatient {
                user_id: patient.id.clone(),
                ..NewPatient::default()
            },
        )
        .await
        .unwrap();

    let principal = |user: &User| Principal {
        user_id: user.id.clone(),
        clinic_id: scope.clinic_id().clone(),
        role: user.role,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        clinic_name: clinic.name.clone(),
    };

    TestClinic {
        admin: principal(&admin),
        doctor: principal(&doctor),
        receptionist: principal(&receptionist),
        patient: principal(&patient),
        doctor_id: doctor_record.id,
        patient_id: patient_record.id,
        scope: scope.clone(),
    }
}
