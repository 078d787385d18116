use std::str::FromStr;

use makeup::DeactivationPolicy;
use makeup::scheduler::ScoringConfig;
use tracing::warn;
use util::config::AppConfig;

/// Tunables for [`crate::MakeupService`], usually taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct MakeupSettings {
    pub code_duration_minutes: i64,
    pub code_max_attempts: u32,
    pub deactivate_policy: DeactivationPolicy,
    pub scoring: ScoringConfig,
}

impl MakeupSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let deactivate_policy = DeactivationPolicy::from_str(cfg.deactivate_policy.trim())
            .unwrap_or_else(|_| {
                warn!(
                    value = %cfg.deactivate_policy,
                    "unknown DEACTIVATE_POLICY, using always_complete"
                );
                DeactivationPolicy::default()
            });

        Self {
            code_duration_minutes: cfg.code_duration_minutes,
            code_max_attempts: cfg.code_max_attempts,
            deactivate_policy,
            scoring: ScoringConfig::default()
                .with_horizon(cfg.suggestion_horizon_days)
                .with_max_suggestions(cfg.suggestion_count),
        }
    }
}

impl Default for MakeupSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let s = MakeupSettings::default();
        assert_eq!(s.code_duration_minutes, 30);
        assert_eq!(s.code_max_attempts, 5);
        assert_eq!(s.deactivate_policy, DeactivationPolicy::AlwaysComplete);
        assert_eq!(s.scoring.horizon_days, 14);
        assert_eq!(s.scoring.max_suggestions, 3);
    }

    #[test]
    fn policy_is_parsed_and_garbage_falls_back() {
        let mut cfg = AppConfig::default();
        cfg.deactivate_policy = "revert_if_unattended".into();
        assert_eq!(
            MakeupSettings::from_config(&cfg).deactivate_policy,
            DeactivationPolicy::RevertIfUnattended
        );

        cfg.deactivate_policy = "sometimes".into();
        assert_eq!(
            MakeupSettings::from_config(&cfg).deactivate_policy,
            DeactivationPolicy::AlwaysComplete
        );
    }
}
