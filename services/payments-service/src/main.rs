//! Payments Service Binary

use payments_service::events::{KafkaProducer, OutboxPublisher};
use payments_service::{api, HttpAccountsClient, PaymentRepository, PaymentService, PaymentsConfig};
use std::sync::Arc;
use std::time::Duration;
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

    tracing::info!("Starting Payments Service");

    let config = PaymentsConfig::from_env();
    tracing::info!("Configuration:");
    tracing::info!("  Bind address: {}", config.bind_address);
    tracing::info!("  Accounts service: {}", config.accounts_url);
    tracing::info!("  Kafka brokers: {:?}", config.kafka_brokers);
    tracing::info!("  Topic: {}", config.topic);

    run_migrations(&config.database_url).await?;

    let pool = settlement_common::db::connect_pool(&config.database_url, config.pool_size).await?;

    let producer = Arc::new(
        KafkaProducer::connect(config.kafka_brokers.clone(), &config.topic)
            .await
            .map_err(|e| anyhow::anyhow!("kafka producer: {}", e))?,
    );

    let publisher = OutboxPublisher::new(
        pool.clone(),
        producer,
        Duration::from_secs(config.outbox_poll_secs),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let publisher_handle = tokio::spawn(publisher.run(shutdown_rx));

    let accounts = Arc::new(HttpAccountsClient::new(config.accounts_url.clone()));
    let service = Arc::new(PaymentService::new(PaymentRepository::new(pool), accounts));

    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        result = api::start_api_server(service, &config.bind_address) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = sigterm.recv() => {
            tracing::info!("Terminate signal received");
        }
    }

    // Stop the outbox publisher before the pool drops.
    let _ = shutdown_tx.send(true);
    let _ = publisher_handle.await;

    tracing::info!("Payments service stopped");
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
