pub mod course_enrollment;
pub mod makeup_attendance;
pub mod makeup_session;
pub mod scheduling_suggestion;

pub use course_enrollment::Entity as CourseEnrollment;
pub use makeup_attendance::Entity as MakeupAttendance;
pub use makeup_session::Entity as MakeupSession;
pub use scheduling_suggestion::Entity as SchedulingSuggestion;
