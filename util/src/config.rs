//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};
use tracing::warn;

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    /// Length of a freshly opened code window.
    pub code_duration_minutes: i64,
    /// Generation attempts before giving up on finding a free code.
    pub code_max_attempts: u32,
    pub suggestion_horizon_days: i64,
    pub suggestion_count: usize,
    /// `always_complete` or `revert_if_unattended`.
    pub deactivate_policy: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

/// Reads `key`, falling back to `default` when unset or unparsable.
fn var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring malformed config value");
            default
        }),
        Err(_) => default,
    }
}

/// True when `path_or_url` is a full connection string rather than a file path.
pub fn is_dsn(path_or_url: &str) -> bool {
    path_or_url.starts_with("sqlite:") || path_or_url.contains("://")
}

/// Connection URL for a configured `DATABASE_PATH`. DSNs pass through unchanged;
/// bare paths become a SQLite URL that creates the file on first use.
pub fn database_url(path_or_url: &str) -> String {
    if is_dsn(path_or_url) {
        path_or_url.to_owned()
    } else {
        format!("sqlite://{path_or_url}?mode=rwc")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".into(),
            project_name: "makeup".into(),
            log_level: "makeup=info".into(),
            log_file: "makeup.log".into(),
            log_to_stdout: false,
            database_path: "data/makeup.db".into(),
            code_duration_minutes: 30,
            code_max_attempts: 5,
            suggestion_horizon_days: 14,
            suggestion_count: 3,
            deactivate_policy: "always_complete".into(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or malformed values fall back to [`AppConfig::default`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            env: env::var("APP_ENV").unwrap_or(defaults.env),
            project_name: env::var("PROJECT_NAME").unwrap_or(defaults.project_name),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            log_to_stdout: var_or("LOG_TO_STDOUT", defaults.log_to_stdout),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            code_duration_minutes: var_or("CODE_DURATION_MINUTES", defaults.code_duration_minutes),
            code_max_attempts: var_or("CODE_MAX_ATTEMPTS", defaults.code_max_attempts),
            suggestion_horizon_days: var_or(
                "SUGGESTION_HORIZON_DAYS",
                defaults.suggestion_horizon_days,
            ),
            suggestion_count: var_or("SUGGESTION_COUNT", defaults.suggestion_count),
            deactivate_policy: env::var("DEACTIVATE_POLICY").unwrap_or(defaults.deactivate_policy),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock
                .write()
                .expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_code_duration_minutes(value: i64) {
        AppConfig::set_field(|cfg| cfg.code_duration_minutes = value);
    }

    pub fn set_code_max_attempts(value: u32) {
        AppConfig::set_field(|cfg| cfg.code_max_attempts = value);
    }

    pub fn set_suggestion_horizon_days(value: i64) {
        AppConfig::set_field(|cfg| cfg.suggestion_horizon_days = value);
    }

    pub fn set_suggestion_count(value: usize) {
        AppConfig::set_field(|cfg| cfg.suggestion_count = value);
    }

    pub fn set_deactivate_policy(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.deactivate_policy = value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "CODE_DURATION_MINUTES",
        "CODE_MAX_ATTEMPTS",
        "SUGGESTION_HORIZON_DAYS",
        "SUGGESTION_COUNT",
        "DEACTIVATE_POLICY",
        "LOG_TO_STDOUT",
    ];

    fn clear() {
        for key in KEYS {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn defaults_when_unset() {
        clear();
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.code_duration_minutes, 30);
        assert_eq!(cfg.code_max_attempts, 5);
        assert_eq!(cfg.suggestion_horizon_days, 14);
        assert_eq!(cfg.suggestion_count, 3);
        assert_eq!(cfg.deactivate_policy, "always_complete");
        assert!(!cfg.log_to_stdout);
    }

    #[test]
    #[serial]
    fn reads_overrides_and_ignores_garbage() {
        clear();
        unsafe {
            env::set_var("CODE_DURATION_MINUTES", "45");
            env::set_var("SUGGESTION_COUNT", "five");
            env::set_var("LOG_TO_STDOUT", "true");
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.code_duration_minutes, 45);
        assert_eq!(cfg.suggestion_count, 3);
        assert!(cfg.log_to_stdout);
        clear();
    }

    #[test]
    fn dsn_passes_through() {
        assert!(is_dsn("sqlite://data/x.db"));
        assert!(is_dsn("sqlite::memory:"));
        assert_eq!(database_url("sqlite://data/x.db"), "sqlite://data/x.db");
        assert_eq!(database_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn bare_path_becomes_sqlite_url() {
        assert!(!is_dsn("data/makeup.db"));
        assert_eq!(database_url("data/makeup.db"), "sqlite://data/makeup.db?mode=rwc");
    }

    #[test]
    #[serial]
    fn setters_update_global() {
        clear();
        AppConfig::set_code_max_attempts(9);
        assert_eq!(AppConfig::global().code_max_attempts, 9);
        AppConfig::reset();
        assert_eq!(AppConfig::global().code_max_attempts, 5);
    }
}
