//! Conversions from external infrastructure errors into domain errors.

use marquee_domain::MarqueeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MarqueeError);

impl From<InfraError> for MarqueeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MarqueeError> for InfraError {
    fn from(value: MarqueeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoMarqueeError {
    fn into_marquee(self) -> MarqueeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MarqueeError */
/* -------------------------------------------------------------------------- */

impl IntoMarqueeError for SqlError {
    fn into_marquee(self) -> MarqueeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        MarqueeError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        MarqueeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        MarqueeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 1555) => {
                        MarqueeError::Database("primary key constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        MarqueeError::Database("foreign key constraint violation".into())
                    }
                    _ => MarqueeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => MarqueeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                MarqueeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                MarqueeError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => MarqueeError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                MarqueeError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                MarqueeError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => MarqueeError::Database("invalid SQL query".into()),
            other => MarqueeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_marquee())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MarqueeError */
/* -------------------------------------------------------------------------- */

impl IntoMarqueeError for HttpError {
    fn into_marquee(self) -> MarqueeError {
        if self.is_timeout() {
            return MarqueeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MarqueeError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => MarqueeError::Auth(message),
                404 => MarqueeError::NotFound(message),
                400..=499 => MarqueeError::InvalidInput(message),
                500..=599 => MarqueeError::Network(message),
                _ => MarqueeError::Network(message),
            };
        }

        MarqueeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_marquee())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → MarqueeError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(MarqueeError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: MarqueeError = InfraError::from(err).into();
        match mapped {
            MarqueeError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn sqlite_no_rows_maps_to_not_found() {
        let mapped: MarqueeError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, MarqueeError::NotFound(_)));
    }

    #[test]
    fn sqlite_unique_violation_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::ConstraintViolation, extended_code: 2067 },
            None,
        );

        let mapped: MarqueeError = InfraError::from(err).into();
        match mapped {
            MarqueeError::Database(msg) => assert!(msg.contains("unique")),
            other => panic!("expected database error, got {:?}", other),
        }
    }
}
