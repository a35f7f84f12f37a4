//! Mapping from diesel and pool failures to [`TelemetryError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::{ErrorKind, TelemetryError};

// Constraint violations carry the invariant that rejected the write, so they
// map to domain kinds instead of a generic storage failure.
impl From<DieselError> for TelemetryError {
    #[track_caller]
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::NotFound => Self::not_found("Record not found"),
            DieselError::DatabaseError(kind, info) => {
                let kind = match kind {
                    DatabaseErrorKind::UniqueViolation => ErrorKind::Conflict,
                    DatabaseErrorKind::ForeignKeyViolation => ErrorKind::NotFound,
                    DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                        ErrorKind::Validation
                    }
                    _ => ErrorKind::Storage,
                };
                Self::new(kind, format!("Database error: {}", info.message()))
            }
            _ => Self::storage(format!("Diesel error: {}", err)),
        }
    }
}

impl From<diesel::ConnectionError> for TelemetryError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::storage(format!("Connection error: {}", err))
    }
}

impl From<diesel::r2d2::PoolError> for TelemetryError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::storage(format!("Connection pool error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found() {
        let err = TelemetryError::from(DieselError::NotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn rollback_maps_to_storage() {
        let err = TelemetryError::from(DieselError::RollbackTransaction);
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
