//! Domain store.
//!
//! [`Store`] is the single handle request code talks to. It is either backed by
//! a live MySQL pool or, when the bootstrapper gave up, inert: reads come back
//! empty and writes resolve without doing anything. Handlers never branch on
//! which one they hold; the maintenance gate keeps clients away from the inert
//! variant.

pub mod bootstrap;
pub mod schema;

mod accounts;
mod departments;
mod employees;
mod requests;
mod tx;
mod workflows;

use std::{future::Future, time::Duration};

use sqlx::{MySqlPool, mysql::MySqlDatabaseError};

pub use employees::EmployeeFilter;
pub use tx::{MySqlTx, StoreTx};

/// MySQL error numbers we translate into domain outcomes.
const ER_DUP_ENTRY: u16 = 1062;
const ER_ROW_IS_REFERENCED: u16 = 1451;
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("row locked by a concurrent transaction")]
    LockConflict,

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("row is still referenced")]
    Referenced,

    #[error("schema error: {0}")]
    Schema(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let number = match &err {
            sqlx::Error::Database(db_err) => db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number()),
            _ => None,
        };

        match number {
            Some(ER_LOCK_WAIT_TIMEOUT | ER_LOCK_DEADLOCK) => StoreError::LockConflict,
            Some(ER_DUP_ENTRY) => StoreError::Duplicate(err.to_string()),
            Some(ER_ROW_IS_REFERENCED) => StoreError::Referenced,
            _ => StoreError::Database(err),
        }
    }
}

/// Runs one store operation under the configured deadline.
pub(crate) async fn bounded<T, F>(limit: Duration, op: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[derive(Clone)]
pub enum Store {
    Live(MySqlStore),
    /// Installed when the database could not be reached at startup.
    Unavailable,
}

impl Store {
    pub fn is_live(&self) -> bool {
        matches!(self, Store::Live(_))
    }

    fn live(&self) -> Option<&MySqlStore> {
        match self {
            Store::Live(db) => Some(db),
            Store::Unavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn bounded_reports_timeouts() {
        let limit = Duration::from_millis(5);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(1)
        };

        let err = bounded(limit, slow).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(d) if d == limit));
    }

    #[actix_web::test]
    async fn bounded_passes_results_through() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, sqlx::Error>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn non_database_errors_stay_generic() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[actix_web::test]
    async fn inert_store_answers_empty() {
        let store = Store::Unavailable;
        assert!(!store.is_live());
        assert!(store.list_departments().await.unwrap().is_empty());
        assert!(store.find_employee(1).await.unwrap().is_none());
        assert!(!store.verify_email("token").await.unwrap());
        assert!(store.delete_employee(1).await.is_ok());
    }
}
