use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// Lifecycle state of the pool, fixed when the handle is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// The startup liveness probe succeeded.
    Ready,
    /// The probe failed; pooled operations fail fast with
    /// [`DbError::Unavailable`] instead of hanging on a dead server.
    Degraded,
}

/// Handle to the shared connection pool.
///
/// Constructed once at process start and passed explicitly into every
/// component that touches the database; there is no global singleton.
/// Cloning is cheap and shares the same underlying pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: MySqlPool,
    state: PoolState,
}

impl Db {
    /// Builds the connection pool and probes it once.
    ///
    /// A failed probe does not abort startup: the service still comes up
    /// and answers every request with a connectivity error, which is more
    /// diagnosable than refusing to bind.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Db, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(&settings.connection_url())?;

        let state = match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => PoolState::Ready,
            Err(probe_err) => {
                tracing::error!(
                    error = %probe_err,
                    "Database liveness probe failed; pool is degraded."
                );
                PoolState::Degraded
            }
        };

        Ok(Db { pool, state })
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Gate applied by every pooled operation before touching the pool.
    pub(crate) fn ensure_ready(&self) -> Result<(), DbError> {
        match self.state {
            PoolState::Ready => Ok(()),
            PoolState::Degraded => Err(DbError::Unavailable),
        }
    }

    pub(crate) fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Drains the pool, waiting for borrowed connections to come back.
    ///
    /// Called once at shutdown; exceeding `timeout` is surfaced as
    /// [`DbError::DrainTimeout`] and treated as fatal by the caller.
    pub async fn close(&self, timeout: Duration) -> Result<(), DbError> {
        tokio::time::timeout(timeout, self.pool.close())
            .await
            .map_err(|_| DbError::DrainTimeout)
    }
}
