//! Attendance submission checks.
//!
//! [`validate_submission`] decides whether a student may mark attendance with a
//! code. It never writes anything: on success it hands back an
//! [`AcceptedSubmission`] and the caller persists the resulting
//! [`AttendanceMark`] through a store that enforces one mark per
//! `(session, student)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

use crate::code::is_well_formed;
use crate::error::AttendanceError;
use crate::session::MakeupSession;

/// Resolves a remedial code to the session currently holding it.
pub trait SessionLookup {
    fn session_by_code(&self, code: &str) -> Option<MakeupSession>;
}

/// Course membership.
pub trait EnrollmentLookup {
    fn is_enrolled(&self, student_id: i64, course_id: i64) -> bool;
}

/// Existing marks.
pub trait MarkLookup {
    fn has_mark(&self, session_id: i64, student_id: i64) -> bool;
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkStatus {
    #[default]
    Present,
    Absent,
}

/// One student's attendance at one make-up session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub session_id: i64,
    pub student_id: i64,
    pub status: MarkStatus,
    /// The code as submitted, which may differ from the session's code after a regeneration.
    pub code_used: String,
    pub ip_address: Option<String>,
    pub marked_at: DateTime<Utc>,
}

/// Everything the caller needs to persist a mark after a successful check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedSubmission {
    pub session: MakeupSession,
    pub student_id: i64,
    pub code_used: String,
    pub submitted_at: DateTime<Utc>,
}

impl AcceptedSubmission {
    pub fn into_mark(self, ip_address: Option<String>) -> AttendanceMark {
        AttendanceMark {
            session_id: self.session.id,
            student_id: self.student_id,
            status: MarkStatus::Present,
            code_used: self.code_used,
            ip_address,
            marked_at: self.submitted_at,
        }
    }
}

/// Checks a submitted code for `student_id` at `now`.
///
/// Checks run in this order and stop at the first failure:
///
/// 1. format: exactly 6 characters of `A-Z0-9` ([`AttendanceError::InvalidFormat`])
/// 2. lookup: the code belongs to a session ([`AttendanceError::UnknownCode`])
/// 3. window: the session's code is currently usable ([`AttendanceError::CodeExpiredOrInactive`])
/// 4. enrollment: the student belongs to the session's course ([`AttendanceError::NotEnrolled`])
/// 5. duplicate: the student has no mark for the session yet ([`AttendanceError::AlreadyMarked`])
///
/// The code is compared case-sensitively; run [`crate::code::normalize_code`] first.
/// The duplicate check is advisory. Concurrent submissions can both pass it, so
/// the store's uniqueness constraint has the final say.
pub fn validate_submission<S, M, E>(
    sessions: &S,
    submitted_code: &str,
    student_id: i64,
    marks: &M,
    enrollments: &E,
    now: DateTime<Utc>,
) -> Result<AcceptedSubmission, AttendanceError>
where
    S: SessionLookup + ?Sized,
    M: MarkLookup + ?Sized,
    E: EnrollmentLookup + ?Sized,
{
    let outcome = run_checks(sessions, submitted_code, student_id, marks, enrollments, now);
    if let Err(err) = &outcome {
        debug!(student_id, error = %err, "attendance submission rejected");
    }
    outcome
}

fn run_checks<S, M, E>(
    sessions: &S,
    submitted_code: &str,
    student_id: i64,
    marks: &M,
    enrollments: &E,
    now: DateTime<Utc>,
) -> Result<AcceptedSubmission, AttendanceError>
where
    S: SessionLookup + ?Sized,
    M: MarkLookup + ?Sized,
    E: EnrollmentLookup + ?Sized,
{
    if !is_well_formed(submitted_code) {
        return Err(AttendanceError::InvalidFormat);
    }

    let session = sessions
        .session_by_code(submitted_code)
        .ok_or(AttendanceError::UnknownCode)?;

    if let Some(state) = session.window_state(now) {
        return Err(AttendanceError::CodeExpiredOrInactive { state });
    }

    if !enrollments.is_enrolled(student_id, session.course_id) {
        return Err(AttendanceError::NotEnrolled);
    }

    if marks.has_mark(session.id, student_id) {
        return Err(AttendanceError::AlreadyMarked);
    }

    Ok(AcceptedSubmission {
        session,
        student_id,
        code_used: submitted_code.to_owned(),
        submitted_at: now,
    })
}

/// Share of enrolled students who attended, as a percentage rounded to one decimal.
pub fn attendance_percent(attended: u64, enrolled: u64) -> f64 {
    if enrolled == 0 {
        return 0.0;
    }
    let pct = attended as f64 / enrolled as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}
