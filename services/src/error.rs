use db::StoreError;
use makeup::{AttendanceError, CodeError};
use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Make-up session {0} not found")]
    SessionNotFound(i64),

    #[error("Scheduling suggestion {0} not found")]
    SuggestionNotFound(i64),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => Self::Database(e),
            StoreError::Code(e) => Self::Code(e),
            StoreError::Attendance(e) => Self::Attendance(e),
        }
    }
}

impl ServiceError {
    /// True for rejections the caller should show as-is. Everything else is an
    /// internal fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Attendance(_) | Self::SessionNotFound(_) | Self::SuggestionNotFound(_)
        )
    }
}
