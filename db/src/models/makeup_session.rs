use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use makeup::{CodeError, MakeupSession, SessionReason, SessionStatus};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::error::{StoreResult, is_unique_violation};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "makeup_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub faculty_id: i64,
    pub course_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub venue: String,
    pub reason: String,
    pub notes: String,
    #[sea_orm(unique)]
    pub remedial_code: String,
    pub code_active: bool,
    pub code_activated_at: Option<DateTime<Utc>>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub status: String,
    pub ai_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::makeup_attendance::Entity")]
    Attendances,
    #[sea_orm(has_many = "super::scheduling_suggestion::Entity")]
    Suggestions,
}

impl Related<super::makeup_attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::scheduling_suggestion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suggestions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for MakeupSession {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, DbErr> {
        let status = SessionStatus::from_str(&m.status)
            .map_err(|_| DbErr::Custom(format!("Unknown session status '{}'", m.status)))?;
        let reason = SessionReason::from_str(&m.reason)
            .map_err(|_| DbErr::Custom(format!("Unknown session reason '{}'", m.reason)))?;

        Ok(MakeupSession {
            id: m.id,
            faculty_id: m.faculty_id,
            course_id: m.course_id,
            remedial_code: m.remedial_code,
            code_active: m.code_active,
            code_activated_at: m.code_activated_at,
            code_expires_at: m.code_expires_at,
            status,
            date: m.date,
            start_time: m.start_time,
            end_time: m.end_time,
            venue: m.venue,
            reason,
            notes: m.notes,
            ai_score: m.ai_score,
            created_at: m.created_at,
        })
    }
}

impl From<&MakeupSession> for ActiveModel {
    fn from(s: &MakeupSession) -> Self {
        ActiveModel {
            id: if s.id == 0 { NotSet } else { Set(s.id) },
            faculty_id: Set(s.faculty_id),
            course_id: Set(s.course_id),
            date: Set(s.date),
            start_time: Set(s.start_time),
            end_time: Set(s.end_time),
            venue: Set(s.venue.clone()),
            reason: Set(s.reason.to_string()),
            notes: Set(s.notes.clone()),
            remedial_code: Set(s.remedial_code.clone()),
            code_active: Set(s.code_active),
            code_activated_at: Set(s.code_activated_at),
            code_expires_at: Set(s.code_expires_at),
            status: Set(s.status.to_string()),
            ai_score: Set(s.ai_score),
            created_at: Set(s.created_at),
        }
    }
}

fn collision(session: &MakeupSession) -> CodeError {
    CodeError::GenerationCollision {
        code: session.remedial_code.clone(),
    }
}

impl Model {
    /// Inserts a newly scheduled session.
    ///
    /// A clash on `remedial_code` comes back as [`CodeError::GenerationCollision`].
    pub async fn create<C>(db: &C, session: &MakeupSession) -> StoreResult<MakeupSession>
    where
        C: ConnectionTrait,
    {
        let mut active = ActiveModel::from(session);
        active.id = NotSet;
        match active.insert(db).await {
            Ok(row) => Ok(MakeupSession::try_from(row)?),
            Err(e) if is_unique_violation(&e) => Err(collision(session).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes back every field of an existing session.
    pub async fn save<C>(db: &C, session: &MakeupSession) -> StoreResult<MakeupSession>
    where
        C: ConnectionTrait,
    {
        match ActiveModel::from(session).update(db).await {
            Ok(row) => Ok(MakeupSession::try_from(row)?),
            Err(e) if is_unique_violation(&e) => Err(collision(session).into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_session<C>(db: &C, id: i64) -> Result<Option<MakeupSession>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find_by_id(id)
            .one(db)
            .await?
            .map(MakeupSession::try_from)
            .transpose()
    }

    pub async fn find_by_code<C>(db: &C, code: &str) -> Result<Option<MakeupSession>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::RemedialCode.eq(code))
            .one(db)
            .await?
            .map(MakeupSession::try_from)
            .transpose()
    }

    /// `(date, start_time)` of the faculty's open sessions in `[from, until)`,
    /// leaving out `exclude_id`.
    pub async fn faculty_bookings<C>(
        db: &C,
        faculty_id: i64,
        from: NaiveDate,
        until: NaiveDate,
        exclude_id: i64,
    ) -> Result<Vec<(NaiveDate, NaiveTime)>, DbErr>
    where
        C: ConnectionTrait,
    {
        let open = [SessionStatus::Scheduled, SessionStatus::Ongoing].map(|s| s.to_string());
        let rows = Entity::find()
            .filter(Column::FacultyId.eq(faculty_id))
            .filter(Column::Date.gte(from))
            .filter(Column::Date.lt(until))
            .filter(Column::Status.is_in(open))
            .filter(Column::Id.ne(exclude_id))
            .order_by_asc(Column::Date)
            .order_by_asc(Column::StartTime)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|r| (r.date, r.start_time)).collect())
    }

    /// Date of the course's most recent completed make-up session.
    pub async fn last_completed_date<C>(db: &C, course_id: i64) -> Result<Option<NaiveDate>, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Status.eq(SessionStatus::Completed.to_string()))
            .order_by_desc(Column::Date)
            .one(db)
            .await?
            .map(|r| r.date))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::test_utils::setup_test_db;
    use chrono::{Duration, TimeZone};
    use makeup::SessionDraft;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 30, 0).unwrap()
    }

    pub(crate) fn draft(
        faculty_id: i64,
        course_id: i64,
        date: NaiveDate,
        hour: u32,
    ) -> SessionDraft {
        SessionDraft {
            faculty_id,
            course_id,
            date,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            venue: "Block 32 Room 101".into(),
            reason: SessionReason::Sick,
            notes: String::new(),
        }
    }

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn create_round_trips_and_finds_by_code() {
        let db = setup_test_db().await;
        let session = MakeupSession::schedule(draft(7, 11, day(12), 9), "A3X7K2".into(), now());

        let stored = Model::create(&db, &session).await.unwrap();
        assert!(stored.id > 0);
        assert_eq!(stored.status, SessionStatus::Scheduled);
        assert_eq!(stored.reason, SessionReason::Sick);

        let found = Model::find_by_code(&db, "A3X7K2").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert!(Model::find_by_code(&db, "ZZZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_code_is_generation_collision() {
        let db = setup_test_db().await;
        let a = MakeupSession::schedule(draft(7, 11, day(12), 9), "A3X7K2".into(), now());
        let b = MakeupSession::schedule(draft(8, 12, day(13), 10), "A3X7K2".into(), now());

        Model::create(&db, &a).await.unwrap();
        let err = Model::create(&db, &b).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Code(CodeError::GenerationCollision { ref code }) if code == "A3X7K2"
        ));
    }

    #[tokio::test]
    async fn save_persists_window_and_regenerated_code() {
        let db = setup_test_db().await;
        let session = MakeupSession::schedule(draft(7, 11, day(12), 9), "A3X7K2".into(), now());
        let mut stored = Model::create(&db, &session).await.unwrap();

        stored.activate(now(), 30);
        stored.regenerate("NEW123".into());
        Model::save(&db, &stored).await.unwrap();

        let reloaded = Model::find_session(&db, stored.id).await.unwrap().unwrap();
        assert!(reloaded.code_active);
        assert_eq!(reloaded.code_expires_at, Some(now() + Duration::minutes(30)));
        assert_eq!(reloaded.status, SessionStatus::Ongoing);
        assert!(Model::find_by_code(&db, "A3X7K2").await.unwrap().is_none());
        assert_eq!(
            Model::find_by_code(&db, "NEW123").await.unwrap().map(|s| s.id),
            Some(stored.id)
        );
    }

    #[tokio::test]
    async fn bookings_cover_open_sessions_in_range_only() {
        let db = setup_test_db().await;
        let mut code = 0;
        let mut add = |faculty_id: i64, date: NaiveDate, hour: u32| {
            code += 1;
            let draft = draft(faculty_id, 11, date, hour);
            MakeupSession::schedule(draft, format!("CODE{code:02}"), now())
        };

        let current = Model::create(&db, &add(7, day(10), 9)).await.unwrap();
        Model::create(&db, &add(7, day(12), 9)).await.unwrap();
        let mut done = add(7, day(13), 10);
        done.status = SessionStatus::Completed;
        Model::create(&db, &done).await.unwrap();
        // other faculty
        Model::create(&db, &add(8, day(12), 14)).await.unwrap();
        // out of range
        Model::create(&db, &add(7, day(30), 9)).await.unwrap();

        let bookings = Model::faculty_bookings(&db, 7, day(10), day(24), current.id)
            .await
            .unwrap();
        assert_eq!(
            bookings,
            vec![(day(12), NaiveTime::from_hms_opt(9, 0, 0).unwrap())]
        );
    }

    #[tokio::test]
    async fn last_completed_date_picks_latest() {
        let db = setup_test_db().await;
        assert!(Model::last_completed_date(&db, 11).await.unwrap().is_none());

        for (code, d) in [("AAAAA1", 3), ("AAAAA2", 6), ("AAAAA3", 4)] {
            let mut s = MakeupSession::schedule(draft(7, 11, day(d), 9), code.into(), now());
            s.status = SessionStatus::Completed;
            Model::create(&db, &s).await.unwrap();
        }
        let mut open = MakeupSession::schedule(draft(7, 11, day(9), 9), "AAAAA4".into(), now());
        open.status = SessionStatus::Ongoing;
        Model::create(&db, &open).await.unwrap();

        assert_eq!(Model::last_completed_date(&db, 11).await.unwrap(), Some(day(6)));
    }
}
