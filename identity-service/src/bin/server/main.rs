use std::sync::Arc;

use identity_service::config::Config;
use identity_service::identity::ports::CredentialStore;
use identity_service::maintenance::spawn_sweeper;
use identity_service::outbound::memory::InMemoryCredentialStore;
use identity_service::outbound::memory::InMemoryResetTokenStore;
use identity_service::outbound::memory::InMemoryRevocationLedger;
use identity_service::outbound::postgres::PostgresCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    let credential_store = match config.database {
        Some(_) => "postgresql",
        None => "memory",
    };

    tracing::info!(
        credential_store,
        sweep_interval_seconds = config.maintenance.sweep_interval_seconds,
        "Configuration loaded"
    );

    match &config.database {
        Some(database) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect(&database.url)
                .await?;
            tracing::info!(
                max_connections = MAX_CONNECTIONS,
                database = "postgresql",
                "Database connection pool created"
            );

            let credentials = PostgresCredentialStore::new(pg_pool);
            credentials.migrate().await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            run(&config, Arc::new(credentials)).await
        }
        None => {
            tracing::warn!("No database configured, credentials are kept in memory");
            run(&config, Arc::new(InMemoryCredentialStore::new())).await
        }
    }
}

/// Host the service over `credentials` and sweep expired state until Ctrl-C.
async fn run<CS: CredentialStore>(config: &Config, credentials: Arc<CS>) -> anyhow::Result<()> {
    let service = Arc::new(config.build_service(
        credentials,
        Arc::new(InMemoryRevocationLedger::new()),
        Arc::new(InMemoryResetTokenStore::new()),
    )?);

    let sweeper = spawn_sweeper(Arc::clone(&service), config.sweep_interval());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    sweeper.shutdown().await;
    tracing::info!("Service stopped");

    Ok(())
}
