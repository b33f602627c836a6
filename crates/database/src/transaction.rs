use crate::connection::Db;
use crate::error::DbError;
use futures::future::BoxFuture;
use sqlx::MySqlConnection;

impl Db {
    /// Runs `work` inside a single database transaction.
    ///
    /// The closure borrows one connection for its whole duration and must
    /// run every statement through [`crate::query::execute_on`] /
    /// [`crate::query::fetch_rows_on`] on that connection, so a
    /// zero-affected write anywhere surfaces as a failure and aborts the
    /// batch.
    ///
    /// Commit happens only when `work` returns `Ok`; any error rolls the
    /// transaction back and is rethrown unchanged, preserving its
    /// classification. The connection is released exactly once on every
    /// terminal path: sqlx's `Transaction` guard rolls back and returns
    /// the connection on drop, so no path can leak or double-release it.
    pub async fn transaction<T, F>(&self, work: F) -> Result<T, DbError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut MySqlConnection) -> BoxFuture<'c, Result<T, DbError>> + Send,
    {
        self.ensure_ready()?;
        let mut tx = self.pool().begin().await?;

        match work(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(work_err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // The original failure is the one the caller needs to
                    // see; the rollback failure only goes to the logs.
                    tracing::error!(
                        error = %rollback_err,
                        "Rollback failed after transaction error."
                    );
                }
                Err(work_err)
            }
        }
    }
}
