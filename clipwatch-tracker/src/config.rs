//! Tracker configuration
//!
//! Every timing threshold the engine uses lives here so deployments can tune
//! polling cadence and the stall/fallback heuristics without code changes.

use std::time::Duration;

use crate::error::TrackerError;

/// Job tracker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Delay between status checks for a job that is still running
    pub poll_interval: Duration,

    /// Delay before re-checking a job whose content was not ready yet
    pub completion_retry_interval: Duration,

    /// Delay after a tick that made a fallback download attempt
    pub fallback_retry_interval: Duration,

    /// Job age after which a direct content download is forced
    pub fallback_after: Duration,

    /// Minimum gap between two fallback download attempts
    pub fallback_spacing: Duration,

    /// Time in progress after which a stall warning is emitted
    pub stall_after: Duration,

    /// Refresh cadence of the countdown view
    pub countdown_tick: Duration,

    /// Completion-path "not ready" answers tolerated before the job fails
    ///
    /// `None` retries forever.
    pub max_completion_retries: Option<u32>,
}

impl TrackerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional, in seconds):
    /// - CLIPWATCH_POLL_INTERVAL (default: 60)
    /// - CLIPWATCH_COMPLETION_RETRY_INTERVAL (default: 10)
    /// - CLIPWATCH_FALLBACK_RETRY_INTERVAL (default: 15)
    /// - CLIPWATCH_FALLBACK_AFTER (default: 180)
    /// - CLIPWATCH_FALLBACK_SPACING (default: 30)
    /// - CLIPWATCH_STALL_AFTER (default: 600)
    /// - CLIPWATCH_COUNTDOWN_TICK (default: 1)
    /// - CLIPWATCH_MAX_COMPLETION_RETRIES (count, default: 90; `0` or `none` = unbounded)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_completion_retries = match std::env::var("CLIPWATCH_MAX_COMPLETION_RETRIES") {
            Ok(value) => parse_retry_bound(&value).unwrap_or(defaults.max_completion_retries),
            Err(_) => defaults.max_completion_retries,
        };

        Self {
            poll_interval: secs_var("CLIPWATCH_POLL_INTERVAL", defaults.poll_interval),
            completion_retry_interval: secs_var(
                "CLIPWATCH_COMPLETION_RETRY_INTERVAL",
                defaults.completion_retry_interval,
            ),
            fallback_retry_interval: secs_var(
                "CLIPWATCH_FALLBACK_RETRY_INTERVAL",
                defaults.fallback_retry_interval,
            ),
            fallback_after: secs_var("CLIPWATCH_FALLBACK_AFTER", defaults.fallback_after),
            fallback_spacing: secs_var("CLIPWATCH_FALLBACK_SPACING", defaults.fallback_spacing),
            stall_after: secs_var("CLIPWATCH_STALL_AFTER", defaults.stall_after),
            countdown_tick: secs_var("CLIPWATCH_COUNTDOWN_TICK", defaults.countdown_tick),
            max_completion_retries,
        }
    }

    /// Delay used after a completed status whose content was not ready
    pub fn completion_retry_delay(&self) -> Duration {
        self.completion_retry_interval.min(self.poll_interval)
    }

    /// Delay used after a tick that attempted a fallback download
    pub fn fallback_retry_delay(&self) -> Duration {
        self.fallback_retry_interval.min(self.poll_interval)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), TrackerError> {
        let intervals = [
            ("poll_interval", self.poll_interval),
            ("completion_retry_interval", self.completion_retry_interval),
            ("fallback_retry_interval", self.fallback_retry_interval),
            ("fallback_spacing", self.fallback_spacing),
            ("countdown_tick", self.countdown_tick),
        ];

        for (name, value) in intervals {
            if value.is_zero() {
                return Err(TrackerError::Config(format!("{name} must be greater than 0")));
            }
        }

        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            completion_retry_interval: Duration::from_secs(10),
            fallback_retry_interval: Duration::from_secs(15),
            fallback_after: Duration::from_secs(3 * 60),
            fallback_spacing: Duration::from_secs(30),
            stall_after: Duration::from_secs(10 * 60),
            countdown_tick: Duration::from_secs(1),
            max_completion_retries: Some(90),
        }
    }
}

fn secs_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Parses a retry bound; `Some(None)` means unbounded
fn parse_retry_bound(value: &str) -> Option<Option<u32>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match value.parse::<u32>().ok()? {
        0 => Some(None),
        n => Some(Some(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.completion_retry_delay(), Duration::from_secs(10));
        assert_eq!(config.fallback_retry_delay(), Duration::from_secs(15));
        assert_eq!(config.max_completion_retries, Some(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_poll_interval_caps_retry_delays() {
        let config = TrackerConfig {
            poll_interval: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(config.completion_retry_delay(), Duration::from_secs(5));
        assert_eq!(config.fallback_retry_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_validation() {
        let mut config = TrackerConfig::default();
        assert!(config.validate().is_ok());

        config.poll_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        config.poll_interval = Duration::from_secs(1);
        config.countdown_tick = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_retry_bound() {
        assert_eq!(parse_retry_bound("none"), Some(None));
        assert_eq!(parse_retry_bound("0"), Some(None));
        assert_eq!(parse_retry_bound(" 12 "), Some(Some(12)));
        assert_eq!(parse_retry_bound("lots"), None);
    }
}
