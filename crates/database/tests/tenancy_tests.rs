use chrono::NaiveDate;
use medflow_config::DatabaseConfig;
use medflow_database::{
    accounts, initialize_database, session_variable_available, AppointmentChanges,
    AppointmentFilter, AppointmentStatus, ClinicId, ClinicScope, NewAppointment, NewClinic,
    NewDoctor, NewPatient, NewUser, Role, TimeOfDay,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct Fixture {
    pool: SqlitePool,
    _dir: TempDir,
}

async fn setup() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("tenancy.db").display()),
        max_connections: 1,
        rls_session_variable: false,
    };
    let pool = initialize_database(&config).await.expect("database");
    Fixture { pool, _dir: dir }
}

async fn create_clinic(pool: &SqlitePool, name: &str) -> ClinicScope {
    let mut conn = pool.acquire().await.unwrap();
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
    ClinicScope::new(pool.clone(), ClinicId::new(clinic.id).unwrap())
}

fn new_user(email: &str, role: Role) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: "hash".to_string(),
        first_name: "Test".to_string(),
        last_name: email.split('@').next().unwrap_or("user").to_string(),
        phone: None,
        role,
        email_verified: true,
    }
}

async fn create_patient(scope: &ClinicScope, email: &str) -> String {
    let mut conn = scope.acquire().await.unwrap();
    let user = scope.staff().insert(&mut conn, new_user(email, Role::Patient)).await.unwrap();
    scope
        .patients()
        .insert(
            &mut conn,
            NewPatient {
                user_id: user.id,
                date_of_birth: None,
                gender: None,
                blood_type: None,
                address: None,
                emergency_contact: None,
                allergies: None,
                chronic_conditions: None,
            },
        )
        .await
        .unwrap()
        .id
}

async fn create_doctor(scope: &ClinicScope, email: &str) -> String {
    let mut conn = scope.acquire().await.unwrap();
    let user = scope.staff().insert(&mut conn, new_user(email, Role::Doctor)).await.unwrap();
    scope
        .doctors()
        .insert(
            &mut conn,
            NewDoctor {
                user_id: user.id,
                specialization: Some("General Practitioner".to_string()),
                license_number: None,
                consultation_fee: Some(100.0),
                biography: None,
            },
        )
        .await
        .unwrap()
        .id
}

fn slot(start: &str, end: &str) -> (TimeOfDay, TimeOfDay) {
    (start.parse().unwrap(), end.parse().unwrap())
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

#[tokio::test]
async fn rows_of_another_clinic_are_invisible() {
    let fixture = setup().await;
    let north = create_clinic(&fixture.pool, "North").await;
    let south = create_clinic(&fixture.pool, "South").await;

    let patient_id = create_patient(&north, "north.patient@example.com").await;

    let mut conn = fixture.pool.acquire().await.unwrap();
    assert!(north.patients().find(&mut conn, &patient_id).await.unwrap().is_some());
    assert!(south.patients().find(&mut conn, &patient_id).await.unwrap().is_none());
    assert!(south.patients().list(&mut conn).await.unwrap().is_empty());
    assert_eq!(north.patients().list(&mut conn).await.unwrap().len(), 1);
}

#[tokio::test]
async fn conflict_query_uses_inclusive_boundaries_and_skips_cancelled() {
    let fixture = setup().await;
    let scope = create_clinic(&fixture.pool, "Clinic").await;
    let patient_id = create_patient(&scope, "patient@example.com").await;
    let doctor_id = create_doctor(&scope, "doctor@example.com").await;

    let mut conn = scope.acquire().await.unwrap();
    let (start, end) = slot("09:00", "09:30");
    let booked = scope
        .appointments()
        .insert(
            &mut conn,
            NewAppointment {
                patient_id: patient_id.clone(),
                doctor_id: doctor_id.clone(),
                service_id: None,
                date: date(),
                start,
                end,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(booked.status, AppointmentStatus::Scheduled);
    assert_eq!(booked.start_time, "09:00");

    let appointments = scope.appointments();

    let (start, end) = slot("09:30", "10:00");
    let touching = appointments
        .first_conflict(&mut conn, &doctor_id, date(), start, end, None)
        .await
        .unwrap();
    assert_eq!(touching.as_deref(), Some(booked.id.as_str()));

    let (start, end) = slot("10:00", "10:30");
    let later = appointments
        .first_conflict(&mut conn, &doctor_id, date(), start, end, None)
        .await
        .unwrap();
    assert!(later.is_none());

    let (start, end) = slot("09:10", "09:20");
    let excluded = appointments
        .first_conflict(&mut conn, &doctor_id, date(), start, end, Some(&booked.id))
        .await
        .unwrap();
    assert!(excluded.is_none());

    appointments
        .update(
            &mut conn,
            &booked.id,
            AppointmentChanges {
                status: Some(AppointmentStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after_cancel = appointments
        .first_conflict(&mut conn, &doctor_id, date(), start, end, None)
        .await
        .unwrap();
    assert!(after_cancel.is_none());
}

#[tokio::test]
async fn appointment_filter_narrows_by_doctor() {
    let fixture = setup().await;
    let scope = create_clinic(&fixture.pool, "Clinic").await;
    let patient_id = create_patient(&scope, "patient@example.com").await;
    let first = create_doctor(&scope, "first@example.com").await;
    let second = create_doctor(&scope, "second@example.com").await;

    let mut conn = scope.acquire().await.unwrap();
    for doctor_id in [&first, &second] {
        let (start, end) = slot("11:00", "11:15");
        scope
            .appointments()
            .insert(
                &mut conn,
                NewAppointment {
                    patient_id: patient_id.clone(),
                    doctor_id: doctor_id.clone(),
                    service_id: None,
                    date: date(),
                    start,
                    end,
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    let all = scope
        .appointments()
        .list(&mut conn, &AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let filtered = scope
        .appointments()
        .list(
            &mut conn,
            &AppointmentFilter {
                doctor_id: Some(second.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].doctor_id, second);
    assert_eq!(filtered[0].doctor_name, "Test second");
}

#[tokio::test]
async fn session_variable_is_tried_once_and_never_blocks_transactions() {
    let fixture = setup().await;
    let scope = create_clinic(&fixture.pool, "North").await.with_session_variable(true);

    for _ in 0..3 {
        let mut tx = scope.begin().await.expect("transaction opens without set_config");
        sqlx::query("SELECT 1").execute(&mut *tx).await.unwrap();
        tx.commit().await.unwrap();
    }

    assert!(!session_variable_available());
}
