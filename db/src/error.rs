use makeup::code::CodeCollision;
use makeup::{AttendanceError, CodeError};
use sea_orm::{DbErr, SqlErr};

/// Errors from writes that can hit a uniqueness constraint.
///
/// Constraint hits come back as the engine outcome they stand for, so callers
/// handle a lost race exactly like a failed pre-check.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl CodeCollision for StoreError {
    fn collided_code(&self) -> Option<&str> {
        match self {
            StoreError::Code(err) => err.collided_code(),
            _ => None,
        }
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}
