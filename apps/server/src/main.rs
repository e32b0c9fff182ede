use anyhow::Context;
use clap::{Parser, Subcommand};
use medflow_clinic::services::seed::{self, SeedOutcome};
use medflow_config::{load as load_config, AppConfig};
use medflow_gateway::{build_router, AppState};
use medflow_runtime::{shutdown_signal, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "medflow")]
#[command(about = "MedFlow clinic management backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create the demo clinic with sample staff, patients and services
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Migrate => migrate(config).await,
        Commands::Seed => seed_demo(config).await,
    }
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("starting MedFlow backend");

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        services.tenancy,
        services.authenticator,
        services.mailer,
        services.store,
        services.payments,
        services.webhooks,
    )
    .with_public_url(config.http.public_url.clone())
    .with_internal_errors_exposed(config.http.expose_internal_errors);
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    println!("Database at {} is up to date", config.database.url);
    Ok(())
}

async fn seed_demo(config: AppConfig) -> anyhow::Result<()> {
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    match seed::seed_demo(&services.tenancy)
        .await
        .context("failed to seed demo clinic")?
    {
        SeedOutcome::Created { clinic_id } => {
            println!("Demo clinic created: {clinic_id}");
            println!(
                "Sign in as {} with password {}",
                seed::DEMO_ADMIN_EMAIL,
                seed::DEMO_PASSWORD
            );
        }
        SeedOutcome::AlreadySeeded => println!("Demo clinic already present; nothing to do"),
    }
    Ok(())
}
