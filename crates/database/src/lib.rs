//! MedFlow database crate
//!
//! Connection management, migrations, entities, and the clinic-scoped
//! repositories every service goes through.

use sqlx::SqlitePool;
use medflow_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod tenancy;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};
pub use tenancy::{
    clinic_for_payment_intent, session_variable_available, ClinicId, ClinicScope, Tenancy,
};

pub use entities::*;
pub use repos::{accounts, token_repository};

pub use types::{DatabaseError, DatabaseResult};

/// Open the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn initialize_database_enables_foreign_keys() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 1,
            rls_session_variable: false,
        };

        let pool = initialize_database(&config).await.unwrap();

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(result.0);
    }
}
