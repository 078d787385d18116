use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202610190001_create_course_enrollments::Migration),
            Box::new(migrations::m202610190002_create_makeup::Migration),
            Box::new(migrations::m202610190003_create_scheduling_suggestions::Migration),
        ]
    }
}
