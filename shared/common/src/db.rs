//! Connection pool bootstrap shared by all three services

use anyhow::Result;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tracing::info;

/// Build a connection pool and verify the database is reachable.
pub async fn connect_pool(database_url: &str, max_size: usize) -> Result<Pool> {
    let config = database_url.parse::<tokio_postgres::Config>()?;

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let manager = Manager::from_config(config, NoTls, mgr_config);

    let pool = Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

    // Test the connection
    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    info!("Database connection established");

    Ok(pool)
}

/// Verify the pool can still serve queries.
pub async fn health_check(pool: &Pool) -> bool {
    match pool.get().await {
        Ok(client) => client.query_one("SELECT 1", &[]).await.is_ok(),
        Err(_) => false,
    }
}
