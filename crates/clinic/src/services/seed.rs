//! Demo data for local development.

use medflow_auth::hash_password;
use medflow_database::{
    accounts, ClinicChanges, ClinicId, Gender, NewClinic, NewDoctor, NewPatient, NewService,
    NewUser, Role, ServiceCategory, Tenancy,
};
use serde_json::json;
use tracing::info;

use crate::error::ClinicResult;

pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_ADMIN_EMAIL: &str = "admin@medflow.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created { clinic_id: String },
    /// The demo admin already exists; nothing was written.
    AlreadySeeded,
}

struct DemoUser {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone: &'static str,
    role: Role,
}

struct DemoDoctor {
    user: DemoUser,
    specialization: &'static str,
    license_number: &'static str,
    consultation_fee: f64,
    biography: &'static str,
}

struct DemoPatient {
    user: DemoUser,
    date_of_birth: &'static str,
    gender: Gender,
    blood_type: &'static str,
    address: &'static str,
    emergency_contact: &'static str,
    allergies: &'static str,
    chronic_conditions: &'static str,
}

const STAFF: &[DemoUser] = &[
    DemoUser {
        email: DEMO_ADMIN_EMAIL,
        first_name: "Admin",
        last_name: "User",
        phone: "+1234567890",
        role: Role::Admin,
    },
    DemoUser {
        email: "receptionist@medflow.com",
        first_name: "Emily",
        last_name: "Brown",
        phone: "+1234567893",
        role: Role::Receptionist,
    },
];

const DOCTORS: &[DemoDoctor] = &[
    DemoDoctor {
        user: DemoUser {
            email: "dr.smith@medflow.com",
            first_name: "John",
            last_name: "Smith",
            phone: "+1234567891",
            role: Role::Doctor,
        },
        specialization: "General Practitioner",
        license_number: "MD123456",
        consultation_fee: 100.0,
        biography: "Experienced GP with 15 years of practice",
    },
    DemoDoctor {
        user: DemoUser {
            email: "dr.johnson@medflow.com",
            first_name: "Sarah",
            last_name: "Johnson",
            phone: "+1234567892",
            role: Role::Doctor,
        },
        specialization: "Cardiologist",
        license_number: "MD789012",
        consultation_fee: 150.0,
        biography: "Specialized in cardiovascular diseases",
    },
];

const PATIENTS: &[DemoPatient] = &[
    DemoPatient {
        user: DemoUser {
            email: "patient1@example.com",
            first_name: "Michael",
            last_name: "Davis",
            phone: "+1234567894",
            role: Role::Patient,
        },
        date_of_birth: "1985-05-15",
        gender: Gender::Male,
        blood_type: "A+",
        address: "456 Patient Avenue, Health City",
        emergency_contact: "Jane Davis: +1234567895",
        allergies: "Penicillin",
        chronic_conditions: "None",
    },
    DemoPatient {
        user: DemoUser {
            email: "patient2@example.com",
            first_name: "Lisa",
            last_name: "Wilson",
            phone: "+1234567896",
            role: Role::Patient,
        },
        date_of_birth: "1992-08-22",
        gender: Gender::Female,
        blood_type: "O+",
        address: "789 Health Boulevard, Health City",
        emergency_contact: "Robert Wilson: +1234567897",
        allergies: "None",
        chronic_conditions: "Asthma",
    },
];

const SERVICES: &[(&str, &str, f64, i64, ServiceCategory)] = &[
    (
        "General Consultation",
        "Standard consultation with a general practitioner",
        100.0,
        30,
        ServiceCategory::Consultation,
    ),
    (
        "Cardiology Consultation",
        "Specialized cardiovascular consultation",
        150.0,
        45,
        ServiceCategory::Consultation,
    ),
    (
        "Blood Test",
        "Complete blood count and analysis",
        50.0,
        15,
        ServiceCategory::Diagnostic,
    ),
    ("ECG", "Electrocardiogram test", 75.0, 20, ServiceCategory::Diagnostic),
    (
        "Physical Therapy Session",
        "One hour physical therapy session",
        80.0,
        60,
        ServiceCategory::Therapy,
    ),
    (
        "Minor Surgery",
        "Minor surgical procedures",
        500.0,
        120,
        ServiceCategory::Surgery,
    ),
];

impl DemoUser {
    fn to_new_user(&self, password_hash: &str) -> NewUser {
        NewUser {
            email: self.email.to_string(),
            password_hash: password_hash.to_string(),
            first_name: self.first_name.to_string(),
            last_name: self.last_name.to_string(),
            phone: Some(self.phone.to_string()),
            role: self.role,
            email_verified: true,
        }
    }
}

/// Create the demo clinic with its staff, patients and services.
pub async fn seed_demo(tenancy: &Tenancy) -> ClinicResult<SeedOutcome> {
    let mut tx = tenancy.pool().begin().await?;
    if accounts::email_taken(&mut tx, DEMO_ADMIN_EMAIL).await? {
        info!("demo data already present");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let clinic = accounts::create_clinic(
        &mut tx,
        NewClinic {
            name: "MedFlow Demo Clinic".to_string(),
            email: Some("contact@medflowdemo.com".to_string()),
            phone: Some("+1234567890".to_string()),
        },
    )
    .await?;
    let scope = tenancy.scope(ClinicId::new(clinic.id.clone())?);

    let weekday = json!({ "start": "08:00", "end": "18:00" });
    scope
        .clinic()
        .update(
            &mut tx,
            ClinicChanges {
                address: Some("123 Medical Street, Health City, HC 12345".to_string()),
                description: Some(
                    "A full-service medical clinic providing comprehensive healthcare.".to_string(),
                ),
                settings: Some(json!({
                    "workingHours": {
                        "monday": weekday,
                        "tuesday": weekday,
                        "wednesday": weekday,
                        "thursday": weekday,
                        "friday": weekday,
                        "saturday": { "start": "09:00", "end": "14:00" },
                        "sunday": { "closed": true }
                    }
                })),
                ..ClinicChanges::default()
            },
        )
        .await?;

    let password_hash = hash_password(DEMO_PASSWORD)?;

    for demo in STAFF {
        scope.staff().insert(&mut tx, demo.to_new_user(&password_hash)).await?;
    }

    for demo in DOCTORS {
        let user = scope
            .staff()
            .insert(&mut tx, demo.user.to_new_user(&password_hash))
            .await?;
        scope
            .doctors()
            .insert(
                &mut tx,
                NewDoctor {
                    user_id: user.id,
                    specialization: Some(demo.specialization.to_string()),
                    license_number: Some(demo.license_number.to_string()),
                    consultation_fee: Some(demo.consultation_fee),
                    biography: Some(demo.biography.to_string()),
                },
            )
            .await?;
    }

    for demo in PATIENTS {
        let user = scope
            .staff()
            .insert(&mut tx, demo.user.to_new_user(&password_hash))
            .await?;
        scope
            .patients()
            .insert(
                &mut tx,
                NewPatient {
                    user_id: user.id,
                    date_of_birth: Some(demo.date_of_birth.to_string()),
                    gender: Some(demo.gender),
                    blood_type: Some(demo.blood_type.to_string()),
                    address: Some(demo.address.to_string()),
                    emergency_contact: Some(demo.emergency_contact.to_string()),
                    allergies: Some(demo.allergies.to_string()),
                    chronic_conditions: Some(demo.chronic_conditions.to_string()),
                },
            )
            .await?;
    }

    for (name, description, price, duration, category) in SERVICES {
        scope
            .services()
            .insert(
                &mut tx,
                NewService {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    price: *price,
                    duration: *duration,
                    category: *category,
                    is_active: true,
                },
            )
            .await?;
    }

    tx.commit().await?;
    info!(
        clinic_id = %clinic.id,
        staff = STAFF.len() + DOCTORS.len(),
        patients = PATIENTS.len(),
        services = SERVICES.len(),
        "demo clinic seeded"
    );

    Ok(SeedOutcome::Created {
        clinic_id: clinic.id,
    })
}
