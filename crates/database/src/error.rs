use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// MySQL error number for a duplicate-key insert (`ER_DUP_ENTRY`).
const ER_DUP_ENTRY: u32 = 1062;
/// MySQL error number for a `SIGNAL SQLSTATE '45000'` raised by a trigger.
const ER_SIGNAL_EXCEPTION: u32 = 1644;

/// Message used for every connectivity-class failure. Deliberately vague:
/// the real cause goes to the logs, not to the client.
pub const GENERIC_DB_MESSAGE: &str = "Could not connect to the database.";

#[derive(Error, Debug)]
pub enum DbError {
    /// The startup liveness probe failed and the pool is degraded; all
    /// pooled operations fail fast with this instead of hanging.
    #[error("Could not connect to the database.")]
    Unavailable,

    /// The pool did not drain within the shutdown grace period.
    #[error("Timed out draining the database connection pool.")]
    DrainTimeout,

    /// A read that was required to find at least one row found none.
    /// Carries the call site's not-found message.
    #[error("{0}")]
    EmptyResults(String),

    /// A write that was required to affect at least one row affected none.
    /// Carries the call site's message.
    #[error("{0}")]
    NoUpdate(String),

    /// A JSON text column could not be decoded into its structured shape.
    #[error("{0} could not be loaded.")]
    MalformedData(&'static str),

    /// Any other failure surfaced by the database driver. Constraint
    /// violations and trigger rejections arrive here and are split out
    /// by [`DbError::classify`].
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

impl DbError {
    /// Maps this failure to the HTTP status code and user-facing message
    /// emitted by the response layer.
    ///
    /// Total and side-effect free, so the single catch site can call it
    /// unconditionally. Classification priority: driver error codes first,
    /// then the empty/no-update markers, then anything carrying a message,
    /// then the generic fallback.
    pub fn classify(&self) -> (u16, String) {
        match self {
            DbError::Query(sqlx::Error::Database(db_err)) => {
                match db_err.try_downcast_ref::<MySqlDatabaseError>() {
                    Some(mysql_err) => classify_code(mysql_err.number().into(), mysql_err.message()),
                    None => (500, GENERIC_DB_MESSAGE.to_string()),
                }
            }
            DbError::EmptyResults(message) => (404, message.clone()),
            DbError::NoUpdate(message) => (500, message.clone()),
            DbError::Unavailable | DbError::DrainTimeout => (500, GENERIC_DB_MESSAGE.to_string()),
            other => (500, other.to_string()),
        }
    }
}

/// Maps a MySQL error number to a response. Split from [`DbError::classify`]
/// so the mapping is testable without fabricating a driver error.
pub fn classify_code(number: u32, message: &str) -> (u16, String) {
    match number {
        // Unique-index violation: in practice almost always a taken username.
        ER_DUP_ENTRY => (401, "Username (or something else) already exists.".to_string()),
        // A trigger rejected the write; its message is meant for the user.
        ER_SIGNAL_EXCEPTION => (403, message.to_string()),
        _ => (500, GENERIC_DB_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_is_not_found() {
        let err = DbError::EmptyResults("Could not find the user.".to_string());
        assert_eq!(err.classify(), (404, "Could not find the user.".to_string()));
    }

    #[test]
    fn no_update_is_internal_with_its_message() {
        let err = DbError::NoUpdate("The avatar could not be set.".to_string());
        assert_eq!(err.classify(), (500, "The avatar could not be set.".to_string()));
    }

    #[test]
    fn degraded_pool_maps_to_generic_message() {
        assert_eq!(
            DbError::Unavailable.classify(),
            (500, GENERIC_DB_MESSAGE.to_string())
        );
    }

    #[test]
    fn malformed_column_carries_shape_name() {
        let err = DbError::MalformedData("Challenge waves");
        assert_eq!(
            err.classify(),
            (500, "Challenge waves could not be loaded.".to_string())
        );
    }

    #[test]
    fn driver_error_without_code_keeps_its_message() {
        let err = DbError::Query(sqlx::Error::RowNotFound);
        let (status, message) = err.classify();
        assert_eq!(status, 500);
        assert!(!message.is_empty());
    }

    #[test]
    fn duplicate_key_is_unauthorized() {
        assert_eq!(
            classify_code(1062, "Duplicate entry 'frank' for key 'PRIMARY'"),
            (401, "Username (or something else) already exists.".to_string())
        );
    }

    #[test]
    fn trigger_rejection_forwards_the_trigger_message() {
        assert_eq!(
            classify_code(1644, "You already have an open trade."),
            (403, "You already have an open trade.".to_string())
        );
    }

    #[test]
    fn other_driver_codes_are_generic_internal_errors() {
        assert_eq!(
            classify_code(1205, "Lock wait timeout exceeded"),
            (500, GENERIC_DB_MESSAGE.to_string())
        );
    }
}
