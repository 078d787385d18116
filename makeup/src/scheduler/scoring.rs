use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use tracing::debug;

use super::config::ScoringConfig;

/// Gap of 2-4 days from the reference session.
pub const WEIGHT_GAP_IDEAL: i32 = 30;
/// Gap of 5 or more days.
pub const WEIGHT_GAP_ADEQUATE: i32 = 15;
/// Gap under 2 days, including candidates before the reference date.
pub const WEIGHT_GAP_CLOSE: i32 = 5;

/// 08:00-11:59.
pub const WEIGHT_MORNING: i32 = 20;
/// 12:00-14:59.
pub const WEIGHT_EARLY_AFTERNOON: i32 = 10;
/// 15:00 onwards.
pub const WEIGHT_LATE: i32 = 5;

pub const WEIGHT_NO_CONFLICT: i32 = 40;
pub const PENALTY_CONFLICT: i32 = -20;

pub const WEIGHT_EMPTY_DAY: i32 = 10;
pub const WEIGHT_LIGHT_DAY: i32 = 5;

const REASON_SEPARATOR: &str = " · ";

/// What the caller knows about the faculty's calendar and the course history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotContext {
    /// First candidate date.
    pub today: NaiveDate,
    /// Date of the most recent related session. Falls back to `today`.
    pub reference_date: Option<NaiveDate>,
    /// `(date, start time)` pairs the faculty is already booked for.
    pub booked_slots: HashSet<(NaiveDate, NaiveTime)>,
    /// Number of sessions already on each date.
    pub sessions_by_day: HashMap<NaiveDate, u32>,
}

impl SlotContext {
    pub fn new(today: NaiveDate, reference_date: Option<NaiveDate>) -> Self {
        Self {
            today,
            reference_date,
            ..Default::default()
        }
    }

    /// Fills both `booked_slots` and `sessions_by_day` from one list of bookings.
    pub fn with_bookings<I>(mut self, bookings: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, NaiveTime)>,
    {
        for (date, time) in bookings {
            self.booked_slots.insert((date, time));
            *self.sessions_by_day.entry(date).or_insert(0) += 1;
        }
        self
    }

    fn gap_days(&self, date: NaiveDate) -> i64 {
        (date - self.reference_date.unwrap_or(self.today)).num_days()
    }
}

/// The four sub-scores of one slot, kept so the justification can be derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotBreakdown {
    pub gap_days: i64,
    pub gap: i32,
    pub time_of_day: i32,
    pub conflict: i32,
    pub day_load: i32,
    pub sessions_that_day: u32,
}

impl SlotBreakdown {
    pub fn total(&self) -> i32 {
        self.gap + self.time_of_day + self.conflict + self.day_load
    }

    pub fn is_free(&self) -> bool {
        self.conflict == WEIGHT_NO_CONFLICT
    }

    /// Human-readable reasons, limited to factors that actually scored.
    pub fn justification(&self, time: NaiveTime) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);

        match self.gap_days {
            2..=4 => parts.push(format!(
                "good gap of {} days from last session",
                self.gap_days
            )),
            d if d >= 5 => parts.push(format!("adequate gap of {d} days")),
            _ => {}
        }

        if time.hour() <= 11 {
            parts.push("morning slot, better learning retention".into());
        }

        if self.is_free() {
            parts.push("faculty is free at this time".into());
        }

        match self.sessions_that_day {
            0 => parts.push("no other sessions on this day".into()),
            1 => parts.push("only one other session on this day".into()),
            _ => {}
        }

        parts.join(REASON_SEPARATOR)
    }
}

/// A ranked candidate slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSuggestion {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub score: i32,
    pub reason: String,
    pub breakdown: SlotBreakdown,
}

fn gap_score(gap_days: i64) -> i32 {
    match gap_days {
        2..=4 => WEIGHT_GAP_IDEAL,
        d if d >= 5 => WEIGHT_GAP_ADEQUATE,
        _ => WEIGHT_GAP_CLOSE,
    }
}

fn time_of_day_score(time: NaiveTime) -> i32 {
    match time.hour() {
        0..=11 => WEIGHT_MORNING,
        12..=14 => WEIGHT_EARLY_AFTERNOON,
        _ => WEIGHT_LATE,
    }
}

fn day_load_score(sessions: u32) -> i32 {
    match sessions {
        0 => WEIGHT_EMPTY_DAY,
        1 => WEIGHT_LIGHT_DAY,
        _ => 0,
    }
}

/// Scores a single slot.
pub fn score_slot(context: &SlotContext, date: NaiveDate, time: NaiveTime) -> SlotSuggestion {
    let gap_days = context.gap_days(date);
    let sessions_that_day = context.sessions_by_day.get(&date).copied().unwrap_or(0);
    let conflict = if context.booked_slots.contains(&(date, time)) {
        PENALTY_CONFLICT
    } else {
        WEIGHT_NO_CONFLICT
    };

    let breakdown = SlotBreakdown {
        gap_days,
        gap: gap_score(gap_days),
        time_of_day: time_of_day_score(time),
        conflict,
        day_load: day_load_score(sessions_that_day),
        sessions_that_day,
    };

    SlotSuggestion {
        date,
        time,
        score: breakdown.total(),
        reason: breakdown.justification(time),
        breakdown,
    }
}

fn candidates(context: &SlotContext, config: &ScoringConfig) -> Vec<(NaiveDate, NaiveTime)> {
    let times: Vec<NaiveTime> = config
        .candidate_hours
        .iter()
        .filter_map(|&h| NaiveTime::from_hms_opt(h, 0, 0))
        .collect();

    (0..config.horizon_days.max(0))
        .map(|offset| context.today + Duration::days(offset))
        .filter(|date| !config.excluded_weekdays.contains(&date.weekday()))
        .flat_map(|date| times.iter().map(move |&t| (date, t)))
        .collect()
}

/// Scores every candidate and orders them best first.
///
/// Ties go to the earlier date, then the earlier time.
pub fn rank_slots(context: &SlotContext, config: &ScoringConfig) -> Vec<SlotSuggestion> {
    let mut scored: Vec<SlotSuggestion> = candidates(context, config)
        .into_iter()
        .map(|(date, time)| score_slot(context, date, time))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.time.cmp(&b.time))
    });
    scored
}

/// The top `config.max_suggestions` slots from [`rank_slots`].
pub fn score_slots(context: &SlotContext, config: &ScoringConfig) -> Vec<SlotSuggestion> {
    let mut ranked = rank_slots(context, config);
    let considered = ranked.len();
    ranked.truncate(config.max_suggestions);
    debug!(
        considered,
        returned = ranked.len(),
        best = ranked.first().map(|s| s.score),
        "scored make-up slots"
    );
    ranked
}
