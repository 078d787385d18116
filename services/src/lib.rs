//! Make-up class workflows on top of the database.
//!
//! [`makeup_service::MakeupService`] gathers what the engine needs from the
//! store, runs the engine, and writes the outcome back. The store's uniqueness
//! constraints settle any race the engine's pre-checks cannot see.

pub mod error;
pub mod makeup_service;
pub mod settings;

pub use error::ServiceError;
pub use makeup_service::{AttendanceStats, MakeupService, ScheduledSession};
pub use settings::MakeupSettings;
