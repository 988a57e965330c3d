//! Accounts Service Binary

use accounts_service::{api, AccountStore, AccountsConfig};
use tokio_postgres::NoTls;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod embedded {
    refinery::embed_migrations!("migrations");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    tracing::info!("Starting Accounts Service");

    let config = AccountsConfig::from_env();
    tracing::info!("Configuration:");
    tracing::info!("  Bind address: {}", config.bind_address);
    tracing::info!("  Pool size: {}", config.pool_size);

    run_migrations(&config.database_url).await?;

    let pool = settlement_common::db::connect_pool(&config.database_url, config.pool_size).await?;
    let store = AccountStore::new(pool);

    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        result = api::start_api_server(store, &config.bind_address) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = sigterm.recv() => {
            tracing::info!("Terminate signal received");
        }
    }

    tracing::info!("Accounts service stopped");
    Ok(())
}

async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let (mut client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("migration connection error: {}", e);
        }
    });

    let report = embedded::migrations::runner().run_async(&mut client).await?;
    for migration in report.applied_migrations() {
        tracing::info!("applied migration {}", migration.name());
    }
    Ok(())
}
