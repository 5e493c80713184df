//! Shared Diesel error classification for the forum repositories.
//!
//! Each repository turns a [`DieselFailure`] into its own port error, so the
//! logging and the connection/query split live in one place.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse category of a failed Diesel call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped mid-operation.
    Connection(String),
    /// A unique or primary key constraint rejected the write.
    UniqueViolation(String),
    /// A foreign key constraint rejected the write.
    ForeignKeyViolation(String),
    /// Anything else.
    Query(String),
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Classify a Diesel error, logging its details at `debug`.
pub(crate) fn classify_diesel_error(error: DieselError, operation: &str) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            %operation,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DieselFailure::Query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => {
            DieselFailure::Query("database query error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            DieselFailure::Connection(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DieselFailure::UniqueViolation(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DieselFailure::ForeignKeyViolation(info.message().to_owned())
        }
        DieselError::DatabaseError(_, info) => DieselFailure::Query(info.message().to_owned()),
        other => DieselFailure::Query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for Diesel error classification.
    use super::*;
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind, message: &str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(message.to_owned()))
    }

    #[rstest]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection, "gone"),
        DieselFailure::Connection("gone".to_owned())
    )]
    #[case(
        database_error(DatabaseErrorKind::UniqueViolation, "duplicate key"),
        DieselFailure::UniqueViolation("duplicate key".to_owned())
    )]
    #[case(
        database_error(DatabaseErrorKind::ForeignKeyViolation, "votes_post_id_fkey"),
        DieselFailure::ForeignKeyViolation("votes_post_id_fkey".to_owned())
    )]
    #[case(
        database_error(DatabaseErrorKind::CheckViolation, "direction check"),
        DieselFailure::Query("direction check".to_owned())
    )]
    #[case(DieselError::NotFound, DieselFailure::Query("record not found".to_owned()))]
    fn classifies_diesel_errors(#[case] error: DieselError, #[case] expected: DieselFailure) {
        assert_eq!(classify_diesel_error(error, "test"), expected);
    }

    #[rstest]
    fn pool_errors_keep_their_message() {
        assert_eq!(
            pool_error_message(PoolError::checkout("connection refused")),
            "connection refused"
        );
    }
}
