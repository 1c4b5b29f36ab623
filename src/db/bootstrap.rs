//! Startup connection sequence.
//!
//! Tries to reach MySQL a bounded number of times with a fixed pause between
//! attempts, then applies the schema policy. Whatever happens, the process
//! keeps running: on terminal failure the service declares maintenance mode
//! and the inert [`Store::Unavailable`] is handed out instead of a pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    Connection, MySqlConnection, MySqlPool,
    mysql::MySqlPoolOptions,
};
use tracing::{error, info, warn};

use crate::{
    config::DatabaseConfig,
    state::{ServiceMode, ServiceStatus},
};

use super::{MySqlStore, Store, StoreError, schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("database unreachable after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("database schema rejected: {0}")]
    Schema(#[source] StoreError),
}

/// One way of reaching the database.
#[async_trait]
pub trait Connector: Sync {
    type Handle: Send;

    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Runs once after a successful connect; failures here are not retried.
    async fn prepare(&self, handle: &Self::Handle) -> Result<(), StoreError>;
}

pub async fn establish<C: Connector>(
    connector: &C,
    policy: RetryPolicy,
) -> Result<C::Handle, BootstrapError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    let handle = loop {
        attempt += 1;
        match connector.connect().await {
            Ok(handle) => break handle,
            Err(e) if attempt < attempts => {
                warn!(
                    error = %e,
                    attempt,
                    remaining = attempts - attempt,
                    delay_ms = policy.delay.as_millis() as u64,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                return Err(BootstrapError::Exhausted {
                    attempts,
                    source: e,
                });
            }
        }
    };

    info!(attempt, "Database connection established");

    connector
        .prepare(&handle)
        .await
        .map_err(BootstrapError::Schema)?;

    Ok(handle)
}

/// Resolves the store for the rest of the process lifetime and declares the
/// matching service mode.
pub async fn bootstrap_with<C>(
    connector: &C,
    policy: RetryPolicy,
    query_timeout: Duration,
    status: &ServiceStatus,
) -> Store
where
    C: Connector<Handle = MySqlPool>,
{
    match establish(connector, policy).await {
        Ok(pool) => {
            status.declare(ServiceMode::Online);
            info!("Service online");
            Store::Live(MySqlStore::new(pool, query_timeout))
        }
        Err(e) => {
            status.declare(ServiceMode::Maintenance);
            error!(error = %e, "Database unavailable, entering maintenance mode");
            Store::Unavailable
        }
    }
}

pub async fn bootstrap(config: &DatabaseConfig, status: &ServiceStatus) -> Store {
    let connector = MySqlConnector { config };
    bootstrap_with(&connector, config.retry_policy(), config.query_timeout, status).await
}

pub struct MySqlConnector<'a> {
    config: &'a DatabaseConfig,
}

impl MySqlConnector<'_> {
    async fn create_database(&self) -> Result<(), StoreError> {
        let mut conn = MySqlConnection::connect_with(&self.config.server_options()).await?;
        let name = self.config.name.replace('`', "``");
        sqlx::query(&format!("CREATE DATABASE IF NOT EXISTS `{name}`"))
            .execute(&mut conn)
            .await?;
        conn.close().await?;
        Ok(())
    }
}

#[async_trait]
impl<'a> Connector for MySqlConnector<'a> {
    type Handle = MySqlPool;

    async fn connect(&self) -> Result<MySqlPool, StoreError> {
        let config = self.config;

        if config.create_database {
            self.create_database().await?;
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_max)
            .min_connections(config.pool_min)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(config.connect_options())
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            pool_max = config.pool_max,
            "Connected to MySQL"
        );
        Ok(pool)
    }

    async fn prepare(&self, pool: &MySqlPool) -> Result<(), StoreError> {
        schema::apply(pool, self.config.schema_policy).await
    }
}
