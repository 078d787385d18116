use chrono::Weekday;

/// Knobs for candidate generation. The factor weights themselves are fixed
/// constants in [`super::scoring`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Candidates cover `[today, today + horizon_days)`.
    pub horizon_days: i64,
    /// Hours of the day (on the hour) tried on every candidate date.
    pub candidate_hours: Vec<u32>,
    /// How many ranked slots to return.
    pub max_suggestions: usize,
    /// Dates falling on these weekdays are never proposed.
    pub excluded_weekdays: Vec<Weekday>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            candidate_hours: vec![8, 9, 10, 12, 14, 15],
            max_suggestions: 3,
            excluded_weekdays: vec![Weekday::Sun],
        }
    }
}

impl ScoringConfig {
    pub fn with_horizon(mut self, horizon_days: i64) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }
}
