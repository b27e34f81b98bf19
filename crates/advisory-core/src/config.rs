//! Portal configuration

use crate::auth::LockoutPolicy;
use crate::error::ConfigError;
use crate::telemetry::LogFormat;
use advisory_estimation::{ShapePrecedence, HOURS_PER_DAY};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings key holding the team distribution e-mail
pub const TEAM_EMAIL_SETTING_KEY: &str = "team_distribution_email";

/// Portal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Working hours in a person-day
    pub hours_per_day: f64,
    /// How the two activity-selection shapes combine
    pub shape_precedence: ShapePrecedence,
    /// Login lockout thresholds
    pub lockout: LockoutPolicy,
    /// Lifetime of an anonymous request draft
    pub draft_ttl_hours: i64,
    /// Log line format
    pub log_format: LogFormat,
    /// Settings key for the team distribution e-mail
    pub team_email_setting_key: String,
}

impl PortalConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With hours per person-day
    #[inline]
    #[must_use]
    pub fn with_hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = hours;
        self
    }

    /// With shape precedence
    #[inline]
    #[must_use]
    pub fn with_shape_precedence(mut self, precedence: ShapePrecedence) -> Self {
        self.shape_precedence = precedence;
        self
    }

    /// With lockout policy
    #[inline]
    #[must_use]
    pub fn with_lockout(mut self, lockout: LockoutPolicy) -> Self {
        self.lockout = lockout;
        self
    }

    /// With draft lifetime
    #[inline]
    #[must_use]
    pub fn with_draft_ttl_hours(mut self, hours: i64) -> Self {
        self.draft_ttl_hours = hours;
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Longest accepted draft lifetime, one year
    pub const MAX_DRAFT_TTL_HOURS: i64 = 365 * 24;

    /// Draft lifetime as a duration, capped at [`Self::MAX_DRAFT_TTL_HOURS`]
    #[must_use]
    pub fn draft_ttl(&self) -> Duration {
        Duration::hours(self.draft_ttl_hours.clamp(0, Self::MAX_DRAFT_TTL_HOURS))
    }

    /// Parse TOML text and validate
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io`, `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Reject values the services cannot work with
    ///
    /// # Errors
    /// `ConfigError::Invalid` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.hours_per_day.is_finite() && self.hours_per_day > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "hours_per_day must be positive, got {}",
                self.hours_per_day
            )));
        }
        if !self.lockout.is_consistent() {
            return Err(ConfigError::Invalid(format!(
                "lockout thresholds are inconsistent: warn after {}, lock after {}, for {} minutes",
                self.lockout.warn_after, self.lockout.lock_after, self.lockout.lock_minutes
            )));
        }
        if !(1..=Self::MAX_DRAFT_TTL_HOURS).contains(&self.draft_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "draft_ttl_hours must be between 1 and {}, got {}",
                Self::MAX_DRAFT_TTL_HOURS,
                self.draft_ttl_hours
            )));
        }
        if self.team_email_setting_key.trim().is_empty() {
            return Err(ConfigError::Invalid("team_email_setting_key is empty".into()));
        }
        Ok(())
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            hours_per_day: HOURS_PER_DAY,
            shape_precedence: ShapePrecedence::default(),
            lockout: LockoutPolicy::default(),
            draft_ttl_hours: 24,
            log_format: LogFormat::default(),
            team_email_setting_key: TEAM_EMAIL_SETTING_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = PortalConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.draft_ttl(), Duration::hours(24));
        assert_eq!(config.lockout.lock_after, 10);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let err = PortalConfig::from_toml_str("[lockout]\nlock_minutes = 1000000000000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = PortalConfig::from_toml_str("draft_ttl_hours = 1000000000000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let week = format!("[lockout]\nlock_minutes = {}", LockoutPolicy::MAX_LOCK_MINUTES);
        assert!(PortalConfig::from_toml_str(&week).is_ok());
        let huge = PortalConfig::new().with_draft_ttl_hours(i64::MAX);
        assert_eq!(huge.draft_ttl(), Duration::hours(PortalConfig::MAX_DRAFT_TTL_HOURS));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PortalConfig::from_toml_str(
            r#"
            shape_precedence = "sum"
            log_format = "json"

            [lockout]
            lock_minutes = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.shape_precedence, ShapePrecedence::Sum);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.lockout.lock_minutes, 30);
        assert_eq!(config.lockout.warn_after, 5);
        assert_eq!(config.hours_per_day, 8.0);
    }

    #[test]
    fn zero_hours_per_day_is_rejected() {
        let err = PortalConfig::from_toml_str("hours_per_day = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(PortalConfig::new().with_hours_per_day(-1.0).validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        std::fs::write(&path, "draft_ttl_hours = 48\n").unwrap();
        assert_eq!(PortalConfig::load(&path).unwrap().draft_ttl_hours, 48);
        assert!(matches!(
            PortalConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
