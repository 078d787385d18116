//! Engine Error Types
//!
//! Two families of failures leave the engine:
//!
//! - [`AttendanceError`]: why a submitted code was turned away. Every variant is a
//!   normal, user-facing outcome and maps to a stable message via [`AttendanceError::message`].
//! - [`CodeError`]: code generation could not produce a code the store accepted.
//!
//! Neither family is fatal to the caller except [`CodeError::CodeSpaceExhausted`], which
//! only surfaces after the bounded retry loop has been used up.

use serde::Serialize;
use thiserror::Error;

/// Why a code that exists could not be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// The faculty never opened the window, or already closed it.
    Inactive,
    /// The window was opened but `now` is past `code_expires_at`.
    Expired,
}

/// Outcome of a rejected attendance submission.
///
/// The checks in [`crate::attendance::validate_submission`] stop at the first failure,
/// so exactly one of these is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum AttendanceError {
    #[error("code must be exactly 6 characters from A-Z and 0-9")]
    InvalidFormat,

    #[error("no make-up session uses this code")]
    UnknownCode,

    #[error("code is not usable: {state:?}")]
    CodeExpiredOrInactive { state: WindowState },

    #[error("student is not enrolled in the session's course")]
    NotEnrolled,

    #[error("attendance already recorded for this session")]
    AlreadyMarked,
}

impl AttendanceError {
    /// Message suitable for showing to the student who submitted the code.
    pub fn message(&self) -> &'static str {
        match self {
            AttendanceError::InvalidFormat => "Please enter a valid 6-character code.",
            AttendanceError::UnknownCode => "Invalid code. Please check and try again.",
            AttendanceError::CodeExpiredOrInactive {
                state: WindowState::Inactive,
            } => "Code is not active yet.",
            AttendanceError::CodeExpiredOrInactive {
                state: WindowState::Expired,
            } => "Code has expired.",
            AttendanceError::NotEnrolled => "You are not enrolled in this course.",
            AttendanceError::AlreadyMarked => "You have already marked attendance.",
        }
    }
}

/// Failures while assigning a remedial code to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// The store already holds this code. Generate another one and retry.
    #[error("generated code {code} is already in use")]
    GenerationCollision { code: String },

    /// Every attempt in the bounded retry loop collided.
    #[error("no free code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_state_picks_distinct_messages() {
        let inactive = AttendanceError::CodeExpiredOrInactive {
            state: WindowState::Inactive,
        };
        let expired = AttendanceError::CodeExpiredOrInactive {
            state: WindowState::Expired,
        };
        assert_eq!(inactive.message(), "Code is not active yet.");
        assert_eq!(expired.message(), "Code has expired.");
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let json = serde_json::to_value(AttendanceError::CodeExpiredOrInactive {
            state: WindowState::Expired,
        })
        .unwrap();
        assert_eq!(json["error"], "code_expired_or_inactive");
        assert_eq!(json["state"], "expired");

        let json = serde_json::to_value(AttendanceError::AlreadyMarked).unwrap();
        assert_eq!(json["error"], "already_marked");
    }

    #[test]
    fn code_errors_display() {
        let err = CodeError::CodeSpaceExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "no free code found after 5 attempts");
    }
}
