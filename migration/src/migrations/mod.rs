pub mod m202610190001_create_course_enrollments;
pub mod m202610190002_create_makeup;
pub mod m202610190003_create_scheduling_suggestions;
