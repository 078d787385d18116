use std::str::FromStr;

use chrono::{DateTime, Utc};
use makeup::{AttendanceError, AttendanceMark, MarkStatus};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder, Set};

use crate::error::{StoreResult, is_unique_violation};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "makeup_attendances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub status: String,
    pub code_used: String,
    pub ip_address: Option<String>,
    pub marked_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::makeup_session::Entity",
        from = "Column::SessionId",
        to = "super::makeup_session::Column::Id"
    )]
    Session,
}

impl Related<super::makeup_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AttendanceMark {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, DbErr> {
        let status = MarkStatus::from_str(&m.status)
            .map_err(|_| DbErr::Custom(format!("Unknown mark status '{}'", m.status)))?;
        Ok(AttendanceMark {
            session_id: m.session_id,
            student_id: m.student_id,
            status,
            code_used: m.code_used,
            ip_address: m.ip_address,
            marked_at: m.marked_at,
        })
    }
}

impl Model {
    /// Stores `mark`. The primary key makes this the final duplicate check: a
    /// second mark for the same `(session, student)` is
    /// [`AttendanceError::AlreadyMarked`], however it got past validation.
    pub async fn record<C>(db: &C, mark: &AttendanceMark) -> StoreResult<()>
    where
        C: ConnectionTrait,
    {
        let row = ActiveModel {
            session_id: Set(mark.session_id),
            student_id: Set(mark.student_id),
            status: Set(mark.status.to_string()),
            code_used: Set(mark.code_used.clone()),
            ip_address: Set(mark.ip_address.clone()),
            marked_at: Set(mark.marked_at),
        };
        match Entity::insert(row).exec_without_returning(db).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AttendanceError::AlreadyMarked.into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists<C>(db: &C, session_id: i64, student_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Entity::find_by_id((session_id, student_id))
            .one(db)
            .await?
            .is_some())
    }

    /// Number of students marked present.
    pub async fn present_count<C>(db: &C, session_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(MarkStatus::Present.to_string()))
            .count(db)
            .await
    }

    /// Marks for a session, earliest first.
    pub async fn for_session<C>(db: &C, session_id: i64) -> Result<Vec<AttendanceMark>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::MarkedAt)
            .order_by_asc(Column::StudentId)
            .all(db)
            .await?
            .into_iter()
            .map(AttendanceMark::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::makeup_session::{
        self,
        tests::{day, draft, now},
    };
    use crate::test_utils::setup_test_db;
    use chrono::Duration;
    use makeup::MakeupSession;

    async fn seeded_session(db: &sea_orm::DatabaseConnection) -> MakeupSession {
        let session = MakeupSession::schedule(draft(7, 11, day(12), 9), "A3X7K2".into(), now());
        makeup_session::Model::create(db, &session).await.unwrap()
    }

    fn mark(session_id: i64, student_id: i64, minutes: i64) -> AttendanceMark {
        AttendanceMark {
            session_id,
            student_id,
            status: MarkStatus::Present,
            code_used: "A3X7K2".into(),
            ip_address: Some("10.0.0.4".into()),
            marked_at: now() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn record_then_list() {
        let db = setup_test_db().await;
        let session = seeded_session(&db).await;

        Model::record(&db, &mark(session.id, 101, 2)).await.unwrap();
        Model::record(&db, &mark(session.id, 100, 1)).await.unwrap();

        let marks = Model::for_session(&db, session.id).await.unwrap();
        assert_eq!(
            marks.iter().map(|m| m.student_id).collect::<Vec<_>>(),
            vec![100, 101]
        );
        assert_eq!(marks[0].ip_address.as_deref(), Some("10.0.0.4"));
        assert!(Model::exists(&db, session.id, 100).await.unwrap());
        assert!(!Model::exists(&db, session.id, 102).await.unwrap());
    }

    #[tokio::test]
    async fn second_mark_is_already_marked() {
        let db = setup_test_db().await;
        let session = seeded_session(&db).await;

        Model::record(&db, &mark(session.id, 100, 1)).await.unwrap();
        let err = Model::record(&db, &mark(session.id, 100, 3)).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Attendance(AttendanceError::AlreadyMarked)
        ));
        assert_eq!(Model::present_count(&db, session.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn absent_marks_are_not_counted() {
        let db = setup_test_db().await;
        let session = seeded_session(&db).await;

        Model::record(&db, &mark(session.id, 100, 1)).await.unwrap();
        let mut absent = mark(session.id, 101, 1);
        absent.status = MarkStatus::Absent;
        Model::record(&db, &absent).await.unwrap();

        assert_eq!(Model::present_count(&db, session.id).await.unwrap(), 1);
    }
}
