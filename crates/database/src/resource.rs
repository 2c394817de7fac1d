use std::panic::{self, AssertUnwindSafe};

use configuration::ConfigStore;
use futures::future::{BoxFuture, FutureExt};
use lifecycle::{Hook, Lifecycle};
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{Any, AnyPool, Connection, Transaction};
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionDescriptor, PoolSettings};
use crate::error::{DbError, TransactionError};

/// The application's live database handle.
///
/// A `Database` only exists once its connection has answered a ping. Clones
/// share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connects using the `database.*` settings and registers a `database`
    /// stop hook that closes the pool.
    ///
    /// Nothing is registered when connecting fails.
    pub async fn new<L>(lifecycle: &mut L, config: &ConfigStore) -> Result<Self, DbError>
    where
        L: Lifecycle + ?Sized,
    {
        let database = Self::connect(config).await?;

        let pool = database.pool.clone();
        lifecycle.append(Hook::new("database").on_stop(move || async move {
            info!("Closing database connection pool.");
            pool.close().await;
            Ok(())
        }));

        Ok(database)
    }

    /// Same as [`Database::new`] for hosts that handle teardown themselves.
    pub async fn connect(config: &ConfigStore) -> Result<Self, DbError> {
        let descriptor = ConnectionDescriptor::from_config(config).inspect_err(|e| {
            error!(error = %e, "Database config is incomplete.");
        })?;
        let options = descriptor.connect_options(config.get_bool("database.debug"))?;
        let settings = PoolSettings::from_config(config);

        info!(database = %descriptor.redacted(), "Connecting to database.");
        Self::open(options, &settings).await
    }

    /// Opens a pool with explicit options and verifies it with a ping.
    pub async fn open(options: AnyConnectOptions, settings: &PoolSettings) -> Result<Self, DbError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(DbError::Open)?;

        let database = Self { pool };
        if let Err(e) = database.ping().await {
            database.close().await;
            return Err(e);
        }

        info!("Database connection established.");
        Ok(database)
    }

    /// Checks that the database is reachable with the driver's native ping.
    pub async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::Ping)?;
        conn.ping().await.map_err(DbError::Ping)
    }

    /// Runs `f` inside a transaction.
    ///
    /// The transaction is committed when `f` returns `Ok` and rolled back when
    /// it returns `Err`. If `f` panics the transaction is rolled back first
    /// and the panic then continues with its original payload.
    ///
    /// ```ignore
    /// let user = db
    ///     .with_transaction(|tx| Box::pin(async move { repo.insert(tx, &new_user).await }))
    ///     .await?;
    /// ```
    pub async fn with_transaction<T, E, F>(&self, f: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(&'c mut Transaction<'static, Any>) -> BoxFuture<'c, Result<T, E>>,
    {
        let mut tx = self.pool.begin().await.map_err(TransactionError::Begin)?;

        let outcome = AssertUnwindSafe(f(&mut tx)).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => {
                tx.commit().await.map_err(TransactionError::Commit)?;
                Ok(value)
            }
            Ok(Err(cause)) => match tx.rollback().await {
                Ok(()) => {
                    debug!("Transaction rolled back.");
                    Err(TransactionError::Aborted(cause))
                }
                Err(rollback) => Err(TransactionError::RollbackFailed { cause, rollback }),
            },
            Err(payload) => {
                if let Err(e) = tx.rollback().await {
                    error!(error = %e, "Rollback after panic failed.");
                } else {
                    warn!("Transaction rolled back after panic.");
                }
                panic::resume_unwind(payload)
            }
        }
    }

    /// Closes every connection in the pool. Safe to call more than once.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// The underlying pool, for application queries.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}
