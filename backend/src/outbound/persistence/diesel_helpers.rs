//! Shared helpers for the Diesel adapters.
//!
//! - Pool and Diesel error mapping into [`StoreError`].
//! - Parsing of text-encoded enum columns.
//! - Integer casts between database and domain widths.

use std::fmt::Display;
use std::str::FromStr;

use tracing::debug;

use crate::domain::ports::StoreError;

use super::pool::PoolError;

/// Map pool errors to connection failures.
pub fn map_pool_error(error: PoolError) -> StoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            StoreError::connection(message)
        }
    }
}

/// Map Diesel errors to store errors, logging the database detail at debug
/// level only.
pub fn map_diesel_error(error: diesel::result::Error) -> StoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = ?info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => StoreError::query("database query error"),
        DieselError::DeserializationError(err) => StoreError::corrupt(err.to_string()),
        DieselError::DatabaseError(kind, _) => match kind {
            DatabaseErrorKind::UniqueViolation => StoreError::query("duplicate row"),
            DatabaseErrorKind::ClosedConnection => {
                StoreError::connection("database connection error")
            }
            DatabaseErrorKind::SerializationFailure => {
                StoreError::query("transaction serialisation failure")
            }
            _ => StoreError::query("database error"),
        },
        _ => StoreError::query("database error"),
    }
}

/// Parse a text column into a domain enum.
pub fn parse_column<T>(raw: &str, column: &'static str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|err| StoreError::corrupt(format!("{column}: {err}")))
}

/// Parse an optional text column.
pub fn parse_optional_column<T>(
    raw: Option<&str>,
    column: &'static str,
) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|value| parse_column(value, column)).transpose()
}

/// Database `INTEGER` count into a domain `u32`.
pub fn count_from_db(value: i32, column: &'static str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::corrupt(format!("{column} is negative")))
}

/// Domain `u32` count into a database `INTEGER`.
pub fn count_to_db(value: u32, column: &'static str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::query(format!("{column} exceeds INTEGER")))
}

/// `true` when at least one row was written by an `ON CONFLICT DO NOTHING`
/// insert.
pub const fn inserted(rows: usize) -> bool {
    rows > 0
}
