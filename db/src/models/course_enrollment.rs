use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, PaginatorTrait, Set};

/// Course membership, used to decide who may mark attendance.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "course_enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Enrolls `student_id` in `course_id`. Enrolling twice is a no-op.
    pub async fn enroll<C>(db: &C, course_id: i64, student_id: i64) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let row = ActiveModel {
            course_id: Set(course_id),
            student_id: Set(student_id),
        };
        Entity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::CourseId, Column::StudentId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(())
    }

    pub async fn is_enrolled<C>(db: &C, course_id: i64, student_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Entity::find_by_id((course_id, student_id))
            .one(db)
            .await?
            .is_some())
    }

    pub async fn count_for_course<C>(db: &C, course_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .count(db)
            .await
    }
}
