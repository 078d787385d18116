//! # Make-up Session Engine
//!
//! Core logic for make-up classes, free of I/O and clocks. Every time-sensitive
//! operation takes `now` explicitly.
//!
//! ## Components
//! - **Code lifecycle** ([`code`], [`session`], [`attendance`]): generate remedial
//!   codes, open and close the activation window, and decide whether a student's
//!   submission is accepted.
//! - **Slot scoring** ([`scheduler`]): rank candidate dates and times for a
//!   future session from the faculty's bookings and the course history.
//!
//! Persistence is left to the caller. [`memory::MemoryStore`] shows the
//! guarantees a store has to give (unique codes, one mark per student and
//! session); the `db` crate gives the same ones on top of SQL constraints.

pub mod attendance;
pub mod code;
pub mod error;
pub mod memory;
pub mod scheduler;
pub mod session;

pub use attendance::{AcceptedSubmission, AttendanceMark, MarkStatus, validate_submission};
pub use error::{AttendanceError, CodeError, WindowState};
pub use session::{DeactivationPolicy, MakeupSession, SessionDraft, SessionReason, SessionStatus};
