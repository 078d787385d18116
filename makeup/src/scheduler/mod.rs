//! # Slot Scoring
//!
//! Recommends future time slots for a make-up session. Every candidate
//! `(date, hour)` in the horizon gets four sub-scores (gap since the last related
//! session, time of day, faculty conflict, day load) which are summed and ranked.
//!
//! Scoring is a pure function of a [`SlotContext`] and a [`ScoringConfig`]; the
//! caller gathers bookings and history from wherever they live.

pub mod config;
pub mod scoring;

pub use config::ScoringConfig;
pub use scoring::{SlotBreakdown, SlotContext, SlotSuggestion, rank_slots, score_slot, score_slots};
