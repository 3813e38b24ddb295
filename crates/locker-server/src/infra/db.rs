use sqlx_core::query::query;
use sqlx_core::transaction::Transaction;
use sqlx_postgres::{PgConnection, Postgres};

use crate::app::AppState;
use crate::domains::errors::ServiceError;
use crate::settings::DbTxIsolation;

pub async fn apply_tx_isolation(
    conn: &mut PgConnection,
    isolation: DbTxIsolation,
) -> Result<(), sqlx_core::Error> {
    match isolation {
        DbTxIsolation::ReadCommitted => {
            query::<Postgres>("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
        }
        DbTxIsolation::RepeatableRead => {
            query::<Postgres>("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        }
        DbTxIsolation::Serializable => {
            query::<Postgres>("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        }
    }
    .execute(&mut *conn)
    .await
    .map(|_| ())
}

/// Opens a transaction with the configured isolation level.
pub async fn begin_tx(
    state: &AppState,
    event: &'static str,
) -> Result<Transaction<'static, Postgres>, sqlx_core::Error> {
    let mut tx = match state.db.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!(event, error = %err, "DB begin failed");
            return Err(err);
        }
    };
    if let Err(err) = apply_tx_isolation(&mut tx, state.db_tx_isolation).await {
        tracing::error!(event, error = %err, "DB begin failed");
        return Err(err);
    }
    Ok(tx)
}

pub async fn rollback(tx: Transaction<'static, Postgres>, event: &'static str) {
    if let Err(err) = tx.rollback().await {
        tracing::error!(event, error = %err, "DB rollback failed");
    }
}

pub async fn commit(
    tx: Transaction<'static, Postgres>,
    event: &'static str,
) -> Result<(), sqlx_core::Error> {
    tx.commit().await.map_err(|err| {
        tracing::error!(event, error = %err, "DB commit failed");
        err
    })
}

/// Commits on success and rolls back on failure.
pub async fn settle<T>(
    tx: Transaction<'static, Postgres>,
    result: Result<T, ServiceError>,
    event: &'static str,
) -> Result<T, ServiceError> {
    match result {
        Ok(value) => {
            commit(tx, event).await.map_err(|_| ServiceError::DbError)?;
            Ok(value)
        }
        Err(err) => {
            rollback(tx, event).await;
            Err(err)
        }
    }
}
