use std::future::Future;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use db::StoreError;
use db::models::{course_enrollment, makeup_attendance, makeup_session, scheduling_suggestion};
use makeup::attendance::{EnrollmentLookup, MarkLookup, SessionLookup, attendance_percent};
use makeup::code::{CodeAttempts, is_well_formed, normalize_code};
use makeup::scheduler::{SlotContext, SlotSuggestion, score_slots};
use makeup::session::CodeStatus;
use makeup::{AttendanceMark, MakeupSession, SessionDraft, validate_submission};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use serde::Serialize;
use tracing::{info, warn};
use util::config::AppConfig;

use crate::error::ServiceError;
use crate::settings::MakeupSettings;

pub use db::models::scheduling_suggestion::Model as SchedulingSuggestion;

/// A freshly scheduled session with the slots proposed for it.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSession {
    pub session: MakeupSession,
    pub suggestions: Vec<SlotSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub attendance_count: u64,
    pub total_enrolled: u64,
    /// One decimal place. `0.0` when nobody is enrolled.
    pub attendance_percent: f64,
}

/// Everything `validate_submission` may ask about one student's submission,
/// read up front so the engine itself stays synchronous.
#[derive(Debug, Default)]
struct Prefetched {
    student_id: i64,
    session: Option<MakeupSession>,
    enrolled: bool,
    marked: bool,
}

impl Prefetched {
    async fn load(db: &DatabaseConnection, code: &str, student_id: i64) -> Result<Self, DbErr> {
        let mut found = Self {
            student_id,
            ..Default::default()
        };
        // A malformed code is rejected before any lookup.
        if !is_well_formed(code) {
            return Ok(found);
        }
        let Some(session) = makeup_session::Model::find_by_code(db, code).await? else {
            return Ok(found);
        };
        found.enrolled =
            course_enrollment::Model::is_enrolled(db, session.course_id, student_id).await?;
        found.marked = makeup_attendance::Model::exists(db, session.id, student_id).await?;
        found.session = Some(session);
        Ok(found)
    }

    fn session(&self) -> Option<&MakeupSession> {
        self.session.as_ref()
    }
}

impl SessionLookup for Prefetched {
    fn session_by_code(&self, code: &str) -> Option<MakeupSession> {
        self.session().filter(|s| s.remedial_code == code).cloned()
    }
}

impl EnrollmentLookup for Prefetched {
    fn is_enrolled(&self, student_id: i64, course_id: i64) -> bool {
        self.enrolled
            && student_id == self.student_id
            && self.session().is_some_and(|s| s.course_id == course_id)
    }
}

impl MarkLookup for Prefetched {
    fn has_mark(&self, session_id: i64, student_id: i64) -> bool {
        self.marked
            && student_id == self.student_id
            && self.session().is_some_and(|s| s.id == session_id)
    }
}

/// Draws codes until `try_store` lands one, at most `max_attempts` times.
async fn with_fresh_code<T, F, Fut>(
    max_attempts: u32,
    mut try_store: F,
) -> Result<T, ServiceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempts = CodeAttempts::new(max_attempts);
    while let Some(code) = attempts.next() {
        if let Some(done) = attempts.settle(try_store(code).await) {
            return done.map_err(ServiceError::from);
        }
    }
    Err(attempts.exhausted().into())
}

pub struct MakeupService {
    db: DatabaseConnection,
    settings: MakeupSettings,
}

impl MakeupService {
    pub fn new(db: DatabaseConnection, settings: MakeupSettings) -> Self {
        Self { db, settings }
    }

    /// Uses the settings in the global [`AppConfig`].
    pub fn from_config(db: DatabaseConnection) -> Self {
        let settings = MakeupSettings::from_config(&AppConfig::global());
        Self::new(db, settings)
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn settings(&self) -> &MakeupSettings {
        &self.settings
    }

    async fn load(&self, session_id: i64) -> Result<MakeupSession, ServiceError> {
        makeup_session::Model::find_session(&self.db, session_id)
            .await?
            .ok_or(ServiceError::SessionNotFound(session_id))
    }

    async fn save(&self, session: &MakeupSession) -> Result<MakeupSession, ServiceError> {
        Ok(makeup_session::Model::save(&self.db, session).await?)
    }

    /// Creates a session with a fresh code, then ranks slots for it and stores
    /// the best ones. The session's `ai_score` is the top score, or 0 when no
    /// slot could be proposed.
    ///
    /// All writes share one transaction: if any of them fails, no session is left behind.
    pub async fn schedule_session(
        &self,
        draft: SessionDraft,
        now: DateTime<Utc>,
    ) -> Result<ScheduledSession, ServiceError> {
        let txn = self.db.begin().await?;
        let scheduled = match self.schedule_in(&txn, draft, now).await {
            Ok(scheduled) => scheduled,
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "rolling back failed schedule");
                }
                return Err(err);
            }
        };
        txn.commit().await?;

        let session = &scheduled.session;
        info!(
            session_id = session.id,
            faculty_id = session.faculty_id,
            course_id = session.course_id,
            ai_score = session.ai_score,
            "make-up session scheduled"
        );
        Ok(scheduled)
    }

    async fn schedule_in<C>(
        &self,
        conn: &C,
        draft: SessionDraft,
        now: DateTime<Utc>,
    ) -> Result<ScheduledSession, ServiceError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut created = with_fresh_code(self.settings.code_max_attempts, |code| {
            let session = MakeupSession::schedule(draft.clone(), code, now);
            // Savepoint per attempt so a collision leaves the outer transaction usable.
            async move {
                let attempt = conn.begin().await?;
                let stored = makeup_session::Model::create(&attempt, &session).await?;
                attempt.commit().await?;
                Ok::<_, StoreError>(stored)
            }
        })
        .await?;

        let suggestions = self.rank_on(conn, &created, now.date_naive()).await?;
        created.ai_score = suggestions.first().map_or(0, |s| s.score);

        scheduling_suggestion::Model::create_batch(conn, created.id, &suggestions, now).await?;
        let session = makeup_session::Model::save(conn, &created).await?;
        Ok(ScheduledSession {
            session,
            suggestions,
        })
    }

    /// Ranks candidate slots for `session` starting at `today`.
    ///
    /// Bookings are the faculty's other open sessions in the horizon. The gap is
    /// measured from the course's last completed make-up session.
    pub async fn suggest_slots(
        &self,
        session: &MakeupSession,
        today: NaiveDate,
    ) -> Result<Vec<SlotSuggestion>, ServiceError> {
        self.rank_on(&self.db, session, today).await
    }

    async fn rank_on<C>(
        &self,
        conn: &C,
        session: &MakeupSession,
        today: NaiveDate,
    ) -> Result<Vec<SlotSuggestion>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let until = today + Duration::days(self.settings.scoring.horizon_days.max(0));
        let bookings = makeup_session::Model::faculty_bookings(
            conn,
            session.faculty_id,
            today,
            until,
            session.id,
        )
        .await?;
        let reference =
            makeup_session::Model::last_completed_date(conn, session.course_id).await?;

        let context = SlotContext::new(today, reference).with_bookings(bookings);
        Ok(score_slots(&context, &self.settings.scoring))
    }

    /// Opens the code window. `duration_minutes` defaults to the configured length.
    pub async fn activate_code(
        &self,
        session_id: i64,
        now: DateTime<Utc>,
        duration_minutes: Option<i64>,
    ) -> Result<MakeupSession, ServiceError> {
        let mut session = self.load(session_id).await?;
        session.activate(
            now,
            duration_minutes.unwrap_or(self.settings.code_duration_minutes),
        );
        self.save(&session).await
    }

    pub async fn deactivate_code(&self, session_id: i64) -> Result<MakeupSession, ServiceError> {
        let mut session = self.load(session_id).await?;
        let attended = makeup_attendance::Model::present_count(&self.db, session_id).await?;
        session.deactivate(self.settings.deactivate_policy, attended);
        self.save(&session).await
    }

    /// Replaces the session's code. Students still holding the old one get
    /// `UnknownCode`; the activation window is left running.
    pub async fn regenerate_code(&self, session_id: i64) -> Result<MakeupSession, ServiceError> {
        let current = self.load(session_id).await?;
        let db = &self.db;
        let current = &current;
        with_fresh_code(self.settings.code_max_attempts, |code| {
            let mut next = current.clone();
            next.regenerate(code);
            async move { makeup_session::Model::save(db, &next).await }
        })
        .await
    }

    pub async fn cancel_session(&self, session_id: i64) -> Result<MakeupSession, ServiceError> {
        let mut session = self.load(session_id).await?;
        session.cancel();
        self.save(&session).await
    }

    /// Checks a student's code and records their attendance.
    ///
    /// The code is trimmed and upper-cased first. If two submissions for the
    /// same student race, the attendance table's primary key lets exactly one
    /// through and the other gets `AlreadyMarked`.
    pub async fn mark_attendance(
        &self,
        raw_code: &str,
        student_id: i64,
        ip_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceMark, ServiceError> {
        let code = normalize_code(raw_code);
        let known = Prefetched::load(&self.db, &code, student_id).await?;
        let accepted = validate_submission(&known, &code, student_id, &known, &known, now)?;

        let mark = accepted.into_mark(ip_address);
        makeup_attendance::Model::record(&self.db, &mark).await?;
        info!(
            session_id = mark.session_id,
            student_id,
            "make-up attendance marked"
        );
        Ok(mark)
    }

    pub async fn code_status(
        &self,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CodeStatus, ServiceError> {
        Ok(self.load(session_id).await?.code_status(now))
    }

    pub async fn attendance_stats(&self, session_id: i64) -> Result<AttendanceStats, ServiceError> {
        let session = self.load(session_id).await?;
        let attendance_count = makeup_attendance::Model::present_count(&self.db, session.id).await?;
        let total_enrolled =
            course_enrollment::Model::count_for_course(&self.db, session.course_id).await?;
        Ok(AttendanceStats {
            attendance_count,
            total_enrolled,
            attendance_percent: attendance_percent(attendance_count, total_enrolled),
        })
    }

    pub async fn attendance(&self, session_id: i64) -> Result<Vec<AttendanceMark>, ServiceError> {
        Ok(makeup_attendance::Model::for_session(&self.db, session_id).await?)
    }

    pub async fn suggestions(
        &self,
        session_id: i64,
    ) -> Result<Vec<SchedulingSuggestion>, ServiceError> {
        Ok(scheduling_suggestion::Model::for_session(&self.db, session_id).await?)
    }

    pub async fn accept_suggestion(
        &self,
        suggestion_id: i64,
    ) -> Result<SchedulingSuggestion, ServiceError> {
        scheduling_suggestion::Model::accept(&self.db, suggestion_id)
            .await?
            .ok_or(ServiceError::SuggestionNotFound(suggestion_id))
    }
}
