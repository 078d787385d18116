//! Make-up session state and the code lifecycle transitions.
//!
//! A session is created `SCHEDULED` with an inactive code. Faculty then drive it
//! through [`MakeupSession::activate`], [`MakeupSession::deactivate`] and
//! [`MakeupSession::regenerate`]. The scheduled date and times are for display
//! only; whether a code is usable depends solely on the activation window.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;

use crate::error::WindowState;

/// Default length of an activation window.
pub const DEFAULT_CODE_DURATION_MINUTES: i64 = 30;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
}

/// Why the make-up class is needed.
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
pub enum SessionReason {
    Holiday,
    Sick,
    Event,
    Extra,
    #[default]
    Other,
}

/// What [`MakeupSession::deactivate`] does to the lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DeactivationPolicy {
    /// Closing the code always completes the session.
    #[default]
    AlwaysComplete,
    /// Closing a session nobody attended puts it back to `SCHEDULED`.
    RevertIfUnattended,
}

/// The caller-supplied details of a session being scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub faculty_id: i64,
    pub course_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue: String,
    #[serde(default)]
    pub reason: SessionReason,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeupSession {
    pub id: i64,
    pub faculty_id: i64,
    pub course_id: i64,
    pub remedial_code: String,
    pub code_active: bool,
    pub code_activated_at: Option<DateTime<Utc>>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue: String,
    pub reason: SessionReason,
    pub notes: String,
    pub ai_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Snapshot returned to pollers that show a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeStatus {
    pub active: bool,
    pub expires_in_seconds: i64,
    pub status: SessionStatus,
}

/// Whether a code with the given window is usable at `now`.
///
/// The window is closed when `active` is false. An active window with no expiry
/// never lapses; otherwise `now == expires_at` still counts as open.
pub fn is_valid(active: bool, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    window_state(active, expires_at, now).is_none()
}

/// `None` when the window is open, otherwise the reason it is not.
pub fn window_state(
    active: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<WindowState> {
    if !active {
        return Some(WindowState::Inactive);
    }
    match expires_at {
        Some(expiry) if now > expiry => Some(WindowState::Expired),
        _ => None,
    }
}

impl MakeupSession {
    /// Builds a freshly scheduled session. The id is assigned by the store.
    pub fn schedule(draft: SessionDraft, remedial_code: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            faculty_id: draft.faculty_id,
            course_id: draft.course_id,
            remedial_code,
            code_active: false,
            code_activated_at: None,
            code_expires_at: None,
            status: SessionStatus::Scheduled,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            venue: draft.venue,
            reason: draft.reason,
            notes: draft.notes,
            ai_score: 0,
            created_at,
        }
    }

    #[inline]
    pub fn is_code_valid(&self, now: DateTime<Utc>) -> bool {
        is_valid(self.code_active, self.code_expires_at, now)
    }

    #[inline]
    pub fn window_state(&self, now: DateTime<Utc>) -> Option<WindowState> {
        window_state(self.code_active, self.code_expires_at, now)
    }

    /// Opens a fresh window of `duration_minutes` starting at `now`.
    ///
    /// Re-activating an open session restarts the timer. Durations below one
    /// minute are raised to one minute.
    pub fn activate(&mut self, now: DateTime<Utc>, duration_minutes: i64) {
        let minutes = duration_minutes.max(1);
        self.code_active = true;
        self.code_activated_at = Some(now);
        self.code_expires_at = Some(now + Duration::minutes(minutes));
        self.status = SessionStatus::Ongoing;
        info!(session_id = self.id, minutes, "remedial code activated");
    }

    /// Closes the window. Timestamps are left as they were.
    ///
    /// `attendance_count` is only consulted by
    /// [`DeactivationPolicy::RevertIfUnattended`].
    pub fn deactivate(
        &mut self,
        policy: DeactivationPolicy,
        attendance_count: u64,
    ) -> SessionStatus {
        self.code_active = false;
        self.status = match policy {
            DeactivationPolicy::RevertIfUnattended if attendance_count == 0 => {
                SessionStatus::Scheduled
            }
            _ => SessionStatus::Completed,
        };
        info!(session_id = self.id, status = %self.status, "remedial code deactivated");
        self.status
    }

    /// Swaps in `new_code` and returns the old one. The window is not touched.
    pub fn regenerate(&mut self, new_code: String) -> String {
        info!(session_id = self.id, "remedial code regenerated");
        std::mem::replace(&mut self.remedial_code, new_code)
    }

    /// Calls the session off. The code stops working immediately.
    pub fn cancel(&mut self) {
        self.code_active = false;
        self.status = SessionStatus::Cancelled;
        info!(session_id = self.id, "make-up session cancelled");
    }

    pub fn code_status(&self, now: DateTime<Utc>) -> CodeStatus {
        let active = self.is_code_valid(now);
        let expires_in_seconds = match (active, self.code_expires_at) {
            (true, Some(expiry)) => (expiry - now).num_seconds().max(0),
            _ => 0,
        };
        CodeStatus {
            active,
            expires_in_seconds,
            status: self.status,
        }
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today && self.status == SessionStatus::Scheduled
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    pub(crate) fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    pub(crate) fn sample_session(code: &str) -> MakeupSession {
        let draft = SessionDraft {
            faculty_id: 7,
            course_id: 11,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            venue: "Block 32 Room 101".into(),
            reason: SessionReason::Holiday,
            notes: String::new(),
        };
        let mut session = MakeupSession::schedule(draft, code.into(), t0());
        session.id = 1;
        session
    }

    #[test]
    fn scheduled_session_starts_inactive() {
        let s = sample_session("A3X7K2");
        assert_eq!(s.status, SessionStatus::Scheduled);
        assert!(!s.code_active);
        assert!(s.code_expires_at.is_none());
        assert!(!s.is_code_valid(t0()));
    }

    #[test]
    fn inactive_is_never_valid_even_inside_old_window() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        s.deactivate(DeactivationPolicy::AlwaysComplete, 3);
        assert!(!s.is_code_valid(t0() + Duration::minutes(1)));
        assert_eq!(
            s.window_state(t0() + Duration::minutes(1)),
            Some(WindowState::Inactive)
        );
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        assert!(s.is_code_valid(t0() + Duration::seconds(29 * 60 + 59)));
        assert!(s.is_code_valid(t0() + Duration::minutes(30)));
        assert!(!s.is_code_valid(t0() + Duration::seconds(30 * 60 + 1)));
        assert_eq!(
            s.window_state(t0() + Duration::seconds(30 * 60 + 1)),
            Some(WindowState::Expired)
        );
    }

    #[test]
    fn active_without_expiry_stays_valid() {
        assert!(is_valid(true, None, t0()));
        assert!(!is_valid(false, None, t0()));
    }

    #[test]
    fn reactivation_resets_timer() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        let later = t0() + Duration::minutes(25);
        s.activate(later, 10);
        assert_eq!(s.code_activated_at, Some(later));
        assert_eq!(s.code_expires_at, Some(later + Duration::minutes(10)));
        assert!(s.code_expires_at >= s.code_activated_at);
        assert_eq!(s.status, SessionStatus::Ongoing);
    }

    #[test]
    fn non_positive_duration_is_raised_to_a_minute() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 0);
        assert_eq!(s.code_expires_at, Some(t0() + Duration::minutes(1)));
    }

    #[test]
    fn deactivate_policies() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        let expires = s.code_expires_at;
        assert_eq!(
            s.deactivate(DeactivationPolicy::RevertIfUnattended, 0),
            SessionStatus::Scheduled
        );
        assert_eq!(s.code_expires_at, expires);

        s.activate(t0(), 30);
        assert_eq!(
            s.deactivate(DeactivationPolicy::RevertIfUnattended, 2),
            SessionStatus::Completed
        );

        s.activate(t0(), 30);
        assert_eq!(
            s.deactivate(DeactivationPolicy::AlwaysComplete, 0),
            SessionStatus::Completed
        );
    }

    #[test]
    fn regenerate_keeps_window() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        let old = s.regenerate("ZZ99ZZ".into());
        assert_eq!(old, "A3X7K2");
        assert_eq!(s.remedial_code, "ZZ99ZZ");
        assert!(s.code_active);
        assert!(s.is_code_valid(t0() + Duration::minutes(5)));
    }

    #[test]
    fn code_status_counts_down() {
        let mut s = sample_session("A3X7K2");
        assert_eq!(
            s.code_status(t0()),
            CodeStatus {
                active: false,
                expires_in_seconds: 0,
                status: SessionStatus::Scheduled
            }
        );

        s.activate(t0(), 30);
        let status = s.code_status(t0() + Duration::minutes(10));
        assert!(status.active);
        assert_eq!(status.expires_in_seconds, 20 * 60);
        assert_eq!(status.status, SessionStatus::Ongoing);

        let status = s.code_status(t0() + Duration::minutes(31));
        assert!(!status.active);
        assert_eq!(status.expires_in_seconds, 0);
    }

    #[test]
    fn cancel_closes_window() {
        let mut s = sample_session("A3X7K2");
        s.activate(t0(), 30);
        s.cancel();
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert_eq!(
            s.window_state(t0() + Duration::minutes(1)),
            Some(WindowState::Inactive)
        );
        assert!(!s.is_upcoming(s.date));
    }

    #[test]
    fn upcoming_requires_future_date_and_scheduled() {
        let mut s = sample_session("A3X7K2");
        let day = s.date;
        assert!(s.is_upcoming(day));
        assert!(!s.is_upcoming(day.succ_opt().unwrap()));
        s.activate(t0(), 30);
        assert!(!s.is_upcoming(day));
    }

    #[test]
    fn status_and_policy_strings() {
        assert_eq!(SessionStatus::Ongoing.to_string(), "ONGOING");
        assert_eq!(
            SessionStatus::from_str("COMPLETED").unwrap(),
            SessionStatus::Completed
        );
        assert_eq!(SessionReason::default().as_ref(), "OTHER");
        assert_eq!(
            DeactivationPolicy::from_str("revert_if_unattended").unwrap(),
            DeactivationPolicy::RevertIfUnattended
        );
    }
}
