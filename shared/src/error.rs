use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Name of the exclusion constraint that forbids overlapping active bookings
/// on one machine.
pub const NO_OVERLAP_CONSTRAINT: &str = "bookings_no_active_overlap";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type BookingResult<T> = Result<T, BookingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl BookingError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Authorization(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Store(_) => "STORE",
        }
    }
}

impl From<DieselError> for BookingError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("Record not found.".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                Self::Conflict("Machine was booked concurrently, please retry.".to_string())
            }
            DieselError::DatabaseError(_, info)
                if info.constraint_name() == Some(NO_OVERLAP_CONSTRAINT) =>
            {
                Self::Conflict(
                    "This machine is already booked for the selected time slot.".to_string(),
                )
            }
            other => Self::Store(other.to_string()),
        }
    }
}
