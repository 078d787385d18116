//! In-process store with the same guarantees the database gives: remedial codes
//! are unique and there is at most one mark per `(session, student)`.
//!
//! Inserts are compare-and-insert under a single lock, so two racing
//! submissions for the same student cannot both land.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::attendance::{
    AttendanceMark, EnrollmentLookup, MarkLookup, SessionLookup, validate_submission,
};
use crate::code::assign_with_retry;
use crate::error::{AttendanceError, CodeError};
use crate::session::{MakeupSession, SessionDraft};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    sessions: HashMap<i64, MakeupSession>,
    codes: HashMap<String, i64>,
    enrollments: HashSet<(i64, i64)>,
    marks: HashMap<(i64, i64), AttendanceMark>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a new session under `code`, failing if another session holds it.
    pub fn insert_session(&self, mut session: MakeupSession) -> Result<MakeupSession, CodeError> {
        let mut inner = self.lock();
        if inner.codes.contains_key(&session.remedial_code) {
            return Err(CodeError::GenerationCollision {
                code: session.remedial_code,
            });
        }
        inner.next_id += 1;
        session.id = inner.next_id;
        inner.codes.insert(session.remedial_code.clone(), session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Schedules a session from `draft`, drawing codes until one is free.
    pub fn schedule(
        &self,
        draft: SessionDraft,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<MakeupSession, CodeError> {
        assign_with_retry(max_attempts, |code| {
            self.insert_session(MakeupSession::schedule(draft.clone(), code, now))
        })
    }

    /// Replaces the stored copy of `session`, re-indexing its code.
    ///
    /// Returns [`CodeError::GenerationCollision`] if the new code belongs to
    /// another session. Unknown ids are ignored.
    pub fn save_session(&self, session: &MakeupSession) -> Result<(), CodeError> {
        let mut inner = self.lock();
        if let Some(&holder) = inner.codes.get(&session.remedial_code) {
            if holder != session.id {
                return Err(CodeError::GenerationCollision {
                    code: session.remedial_code.clone(),
                });
            }
        }
        let Some(previous) = inner.sessions.get(&session.id).cloned() else {
            return Ok(());
        };
        inner.codes.remove(&previous.remedial_code);
        inner.codes.insert(session.remedial_code.clone(), session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    pub fn session(&self, id: i64) -> Option<MakeupSession> {
        self.lock().sessions.get(&id).cloned()
    }

    pub fn enroll(&self, student_id: i64, course_id: i64) {
        self.lock().enrollments.insert((student_id, course_id));
    }

    /// Appends `mark` unless one already exists for its `(session, student)`.
    pub fn insert_mark(&self, mark: AttendanceMark) -> Result<(), AttendanceError> {
        let mut inner = self.lock();
        let key = (mark.session_id, mark.student_id);
        if inner.marks.contains_key(&key) {
            return Err(AttendanceError::AlreadyMarked);
        }
        inner.marks.insert(key, mark);
        Ok(())
    }

    /// Validates a submission and records the mark in one call.
    pub fn mark_attendance(
        &self,
        code: &str,
        student_id: i64,
        ip_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceMark, AttendanceError> {
        let accepted = validate_submission(self, code, student_id, self, self, now)?;
        let mark = accepted.into_mark(ip_address);
        self.insert_mark(mark.clone())?;
        Ok(mark)
    }

    pub fn attendance_count(&self, session_id: i64) -> u64 {
        self.lock()
            .marks
            .keys()
            .filter(|(sid, _)| *sid == session_id)
            .count() as u64
    }
}

impl SessionLookup for MemoryStore {
    fn session_by_code(&self, code: &str) -> Option<MakeupSession> {
        let inner = self.lock();
        let id = inner.codes.get(code)?;
        inner.sessions.get(id).cloned()
    }
}

impl EnrollmentLookup for MemoryStore {
    fn is_enrolled(&self, student_id: i64, course_id: i64) -> bool {
        self.lock().enrollments.contains(&(student_id, course_id))
    }
}

impl MarkLookup for MemoryStore {
    fn has_mark(&self, session_id: i64, student_id: i64) -> bool {
        self.lock().marks.contains_key(&(session_id, student_id))
    }
}
