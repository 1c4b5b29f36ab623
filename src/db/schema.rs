use sqlx::{MySqlPool, migrate::Migrator};
use strum::{Display, EnumString};
use tracing::info;

use super::StoreError;

/// Versioned migrations embedded from `migrations/`.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// How the bootstrapper treats the database schema. This is the only switch;
/// nothing else decides whether the schema may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchemaPolicy {
    /// Apply pending migrations at startup.
    Migrate,
    /// Never alter; refuse to go online unless every migration is applied.
    Verify,
}

pub async fn apply(pool: &MySqlPool, policy: SchemaPolicy) -> Result<(), StoreError> {
    match policy {
        SchemaPolicy::Migrate => {
            MIGRATOR
                .run(pool)
                .await
                .map_err(|e| StoreError::Schema(format!("failed to apply migrations: {e}")))?;
            info!("Database migrations applied");
            Ok(())
        }
        SchemaPolicy::Verify => verify(pool).await,
    }
}

async fn verify(pool: &MySqlPool) -> Result<(), StoreError> {
    let applied = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM _sqlx_migrations WHERE success = TRUE",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| StoreError::Schema(format!("cannot read migration history: {e}")))?;

    let pending = pending_versions(MIGRATOR.iter().map(|m| m.version), &applied);
    if !pending.is_empty() {
        return Err(StoreError::Schema(format!(
            "schema is behind, pending migrations: {pending:?}"
        )));
    }

    info!(applied = applied.len(), "Database schema verified");
    Ok(())
}

fn pending_versions(expected: impl Iterator<Item = i64>, applied: &[i64]) -> Vec<i64> {
    expected.filter(|v| !applied.contains(v)).collect()
}
