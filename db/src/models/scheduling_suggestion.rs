use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use makeup::scheduler::SlotSuggestion;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, IntoActiveModel, QueryOrder, Set};
use serde::Serialize;

/// A persisted slot suggestion for a make-up session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "scheduling_suggestions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub suggested_date: NaiveDate,
    pub suggested_time: NaiveTime,
    pub score: i32,
    pub reason: String,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
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
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stores ranked suggestions for `session_id` in the order given.
    pub async fn create_batch<C>(
        db: &C,
        session_id: i64,
        suggestions: &[SlotSuggestion],
        now: DateTime<Utc>,
    ) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        if suggestions.is_empty() {
            return Ok(());
        }
        let rows = suggestions.iter().map(|s| ActiveModel {
            session_id: Set(session_id),
            suggested_date: Set(s.date),
            suggested_time: Set(s.time),
            score: Set(s.score),
            reason: Set(s.reason.clone()),
            is_accepted: Set(false),
            created_at: Set(now),
            ..Default::default()
        });
        Entity::insert_many(rows).exec_without_returning(db).await?;
        Ok(())
    }

    /// Suggestions for a session, best first. Ties go to the earlier slot.
    pub async fn for_session<C>(db: &C, session_id: i64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_desc(Column::Score)
            .order_by_asc(Column::SuggestedDate)
            .order_by_asc(Column::SuggestedTime)
            .all(db)
            .await
    }

    /// Flags a suggestion as accepted. Accepting twice is harmless.
    ///
    /// Returns `None` when no suggestion has that id.
    pub async fn accept<C>(db: &C, id: i64) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        let Some(row) = Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };
        if row.is_accepted {
            return Ok(Some(row));
        }
        let mut active = row.into_active_model();
        active.is_accepted = Set(true);
        Ok(Some(active.update(db).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::makeup_session::{
        self,
        tests::{day, draft, now},
    };
    use crate::test_utils::setup_test_db;
    use makeup::MakeupSession;
    use makeup::scheduler::{ScoringConfig, SlotContext, score_slots};

    #[tokio::test]
    async fn batch_is_listed_best_first_and_accept_is_idempotent() {
        let db = setup_test_db().await;
        let session = makeup_session::Model::create(
            &db,
            &MakeupSession::schedule(draft(7, 11, day(10), 9), "A3X7K2".into(), now()),
        )
        .await
        .unwrap();

        let context = SlotContext::new(day(10), Some(day(6)));
        let ranked = score_slots(&context, &ScoringConfig::default());
        assert_eq!(ranked.len(), 3);

        // reverse so storage order differs from rank order
        let reversed: Vec<_> = ranked.iter().rev().cloned().collect();
        Model::create_batch(&db, session.id, &reversed, now()).await.unwrap();

        let listed = Model::for_session(&db, session.id).await.unwrap();
        let slots: Vec<_> = listed.iter().map(|s| (s.suggested_date, s.suggested_time)).collect();
        let expected: Vec<_> = ranked.iter().map(|s| (s.date, s.time)).collect();
        assert_eq!(slots, expected);
        assert!(listed.iter().all(|s| !s.is_accepted));

        let first = Model::accept(&db, listed[0].id).await.unwrap().unwrap();
        assert!(first.is_accepted);
        let again = Model::accept(&db, listed[0].id).await.unwrap().unwrap();
        assert_eq!(again, first);
        assert!(Model::accept(&db, 9_999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let db = setup_test_db().await;
        Model::create_batch(&db, 1, &[], now()).await.unwrap();
        assert!(Model::for_session(&db, 1).await.unwrap().is_empty());
    }
}
