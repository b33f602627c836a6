use crate::connection::Db;
use crate::error::DbError;
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::{Executor, FromRow};

/// One positional statement parameter. Owned, so statements can be built
/// up-front and moved into transaction closures without lifetime juggling.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Int(i64::from(value))
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Uint(u64::from(value))
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::Uint(value)
    }
}

/// Empty-result policy for read statements, declared at every call site.
///
/// This is the load-bearing contract of the module: the caller states, at
/// the call, whether zero rows is a legitimate outcome or a logic error,
/// so the classifier can map "nothing found" to the right status without
/// the caller writing its own emptiness checks.
#[derive(Debug, Clone, Copy)]
pub enum OnEmpty {
    /// Zero rows is a valid outcome (optional lookups, open-ended lists).
    Allow,
    /// Zero rows is a failure, reported with this not-found message.
    Fail(&'static str),
}

/// Zero-affected-rows policy for write statements, declared per call site.
/// There is no universal rule for deletes of already-absent rows; each
/// operation decides whether it is idempotent or must-exist.
#[derive(Debug, Clone, Copy)]
pub enum OnZeroAffected {
    /// Affecting nothing is a valid outcome (idempotent deletes).
    Allow,
    /// Affecting nothing is a failure, reported with this message.
    Fail(&'static str),
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy)]
pub struct Mutation {
    pub rows_affected: u64,
    /// Auto-increment id assigned by an insert; zero for other statements.
    pub last_insert_id: u64,
}

/// Executes a parameterized read statement against any executor (pool or
/// borrowed transaction connection) and applies the empty-result policy.
pub async fn fetch_rows_on<'e, E, T>(
    executor: E,
    sql: &str,
    params: Vec<Param>,
    on_empty: OnEmpty,
) -> Result<Vec<T>, DbError>
where
    E: Executor<'e, Database = MySql>,
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin + 'static,
{
    let mut query = sqlx::query_as::<MySql, T>(sql);
    for param in params {
        query = match param {
            Param::Text(value) => query.bind(value),
            Param::Int(value) => query.bind(value),
            Param::Uint(value) => query.bind(value),
        };
    }

    let rows = query.fetch_all(executor).await?;
    if rows.is_empty() {
        if let OnEmpty::Fail(message) = on_empty {
            return Err(DbError::EmptyResults(message.to_string()));
        }
    }
    Ok(rows)
}

/// Executes a parameterized write statement against any executor and
/// applies the zero-affected policy. Shared by the pooled and
/// transaction-scoped paths; there is exactly one statement-execution core.
pub async fn execute_on<'e, E>(
    executor: E,
    sql: &str,
    params: Vec<Param>,
    on_zero: OnZeroAffected,
) -> Result<Mutation, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            Param::Text(value) => query.bind(value),
            Param::Int(value) => query.bind(value),
            Param::Uint(value) => query.bind(value),
        };
    }

    let done = query.execute(executor).await?;
    let mutation = Mutation {
        rows_affected: done.rows_affected(),
        last_insert_id: done.last_insert_id(),
    };
    if mutation.rows_affected == 0 {
        if let OnZeroAffected::Fail(message) = on_zero {
            return Err(DbError::NoUpdate(message.to_string()));
        }
    }
    Ok(mutation)
}

impl Db {
    /// Pooled read. Fails fast with [`DbError::Unavailable`] when the pool
    /// is degraded, before any connection is requested.
    pub async fn fetch_rows<T>(
        &self,
        sql: &str,
        params: Vec<Param>,
        on_empty: OnEmpty,
    ) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin + 'static,
    {
        self.ensure_ready()?;
        fetch_rows_on(self.pool(), sql, params, on_empty).await
    }

    /// Pooled write, with the same fail-fast gate. Transaction bodies skip
    /// the gate and call [`execute_on`] on their borrowed connection: the
    /// transaction already holds a live connection.
    pub async fn execute(
        &self,
        sql: &str,
        params: Vec<Param>,
        on_zero: OnZeroAffected,
    ) -> Result<Mutation, DbError> {
        self.ensure_ready()?;
        execute_on(self.pool(), sql, params, on_zero).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_convert_from_native_types() {
        assert!(matches!(Param::from("frank"), Param::Text(_)));
        assert!(matches!(Param::from(7_i32), Param::Int(7)));
        assert!(matches!(Param::from(7_u32), Param::Uint(7)));
        assert!(matches!(Param::from(-1_i64), Param::Int(-1)));
    }
}
