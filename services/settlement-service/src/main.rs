//! Settlement Service Binary

use settlement_service::{api, SettlementConfig, SettlementConsumer, SettlementStore};
use std::sync::Arc;
use tokio::sync::watch;
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

    tracing::info!("Starting Settlement Service");

    let config = SettlementConfig::from_env();
    tracing::info!("Configuration:");
    tracing::info!("  Bind address: {}", config.bind_address);
    tracing::info!("  Kafka brokers: {:?}", config.kafka_brokers);
    tracing::info!("  Topic: {}", config.topic);

    run_migrations(&config.database_url).await?;

    let pool = settlement_common::db::connect_pool(&config.database_url, config.pool_size).await?;

    let consumer = SettlementConsumer::connect(
        config.kafka_brokers.clone(),
        config.topic.clone(),
        SettlementStore::new(pool.clone()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("settlement consumer: {}", e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_handle = tokio::spawn(consumer.run(shutdown_rx));

    let store = Arc::new(SettlementStore::new(pool));

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

    // Stop the consumer before the pool drops.
    let _ = shutdown_tx.send(true);
    let _ = consumer_handle.await;

    tracing::info!("Settlement service stopped");
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
