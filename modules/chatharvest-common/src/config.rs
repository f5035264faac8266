use std::env;
use std::time::Duration;

use tracing::info;

use crate::error::{HarvestError, Result};

/// How the collector lets the host UI catch up after a scroll before re-observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// No pause at all. Only sensible against an in-memory driver.
    Immediate,
    /// Sleep a random duration in `[min, max)`.
    Jitter { min: Duration, max: Duration },
    /// Poll the row count until it stays unchanged for `quiet`, giving up after `timeout`.
    StableCount { quiet: Duration, timeout: Duration },
}

impl SettlePolicy {
    /// Parse `none`, `jitter:<min_ms>-<max_ms>` or `stable:<quiet_ms>/<timeout_ms>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("none") {
            return Ok(SettlePolicy::Immediate);
        }

        let invalid = || HarvestError::Config(format!("invalid settle policy: {raw}"));
        let (kind, args) = raw.split_once(':').ok_or_else(invalid)?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "jitter" => {
                let (min, max) = args.split_once('-').ok_or_else(invalid)?;
                let min = parse_ms(min).ok_or_else(invalid)?;
                let max = parse_ms(max).ok_or_else(invalid)?;
                if min > max {
                    return Err(invalid());
                }
                Ok(SettlePolicy::Jitter { min, max })
            }
            "stable" => {
                let (quiet, timeout) = args.split_once('/').ok_or_else(invalid)?;
                Ok(SettlePolicy::StableCount {
                    quiet: parse_ms(quiet).ok_or_else(invalid)?,
                    timeout: parse_ms(timeout).ok_or_else(invalid)?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for SettlePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlePolicy::Immediate => write!(f, "none"),
            SettlePolicy::Jitter { min, max } => {
                write!(f, "jitter:{}-{}", min.as_millis(), max.as_millis())
            }
            SettlePolicy::StableCount { quiet, timeout } => {
                write!(f, "stable:{}/{}", quiet.as_millis(), timeout.as_millis())
            }
        }
    }
}

fn parse_ms(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}

/// Harvest configuration. Every workflow invocation reads its bounds and
/// timeouts from here; nothing is kept in process-wide mutable state.
#[derive(Debug, Clone)]
pub struct Config {
    // Target application
    pub app_base_url: String,
    pub public_handle_base_url: String,
    /// Visited before every chat or profile URL so hash-only navigation forces a fresh render.
    pub reset_url: String,

    // Collector bounds
    pub chat_iteration_limit: usize,
    pub post_iteration_limit: usize,
    pub subscriber_iteration_limit: usize,
    pub default_max_posts: usize,
    pub include_archived: bool,

    // Waits
    pub element_timeout: Duration,
    pub profile_field_timeout: Duration,
    pub public_handle_timeout: Duration,
    pub growth_timeout: Duration,
    pub poll_backoff_min: Duration,
    pub poll_backoff_max: Duration,
    pub settle: SettlePolicy,

    // Scroll nudges
    pub post_backscroll_px: i64,
    pub member_jiggle_up_px: i64,
    pub member_jiggle_down_px: i64,
    pub member_jiggle_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_base_url: "https://web.telegram.org/a/".to_string(),
            public_handle_base_url: "https://t.me/".to_string(),
            reset_url: "about:blank".to_string(),
            chat_iteration_limit: 1000,
            post_iteration_limit: 1000,
            subscriber_iteration_limit: 10_000,
            default_max_posts: 1000,
            include_archived: true,
            element_timeout: Duration::from_secs(30),
            profile_field_timeout: Duration::from_secs(1),
            public_handle_timeout: Duration::from_secs(5),
            growth_timeout: Duration::from_secs(5),
            poll_backoff_min: Duration::from_millis(50),
            poll_backoff_max: Duration::from_millis(100),
            settle: SettlePolicy::Jitter {
                min: Duration::from_millis(5000),
                max: Duration::from_millis(7000),
            },
            post_backscroll_px: 1000,
            member_jiggle_up_px: 500,
            member_jiggle_down_px: 1000,
            member_jiggle_rounds: 2,
        }
    }
}

impl Config {
    /// Load configuration from `CHATHARVEST_*` environment variables.
    /// Unset variables keep their defaults; malformed values are a `Config` error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            app_base_url: env_or("CHATHARVEST_APP_BASE_URL", defaults.app_base_url),
            public_handle_base_url: env_or(
                "CHATHARVEST_PUBLIC_HANDLE_BASE_URL",
                defaults.public_handle_base_url,
            ),
            reset_url: env_or("CHATHARVEST_RESET_URL", defaults.reset_url),
            chat_iteration_limit: env_parse(
                "CHATHARVEST_CHAT_ITERATION_LIMIT",
                defaults.chat_iteration_limit,
            )?,
            post_iteration_limit: env_parse(
                "CHATHARVEST_POST_ITERATION_LIMIT",
                defaults.post_iteration_limit,
            )?,
            subscriber_iteration_limit: env_parse(
                "CHATHARVEST_SUBSCRIBER_ITERATION_LIMIT",
                defaults.subscriber_iteration_limit,
            )?,
            default_max_posts: env_parse("CHATHARVEST_MAX_POSTS", defaults.default_max_posts)?,
            include_archived: env_parse("CHATHARVEST_INCLUDE_ARCHIVED", defaults.include_archived)?,
            element_timeout: env_ms("CHATHARVEST_ELEMENT_TIMEOUT_MS", defaults.element_timeout)?,
            profile_field_timeout: env_ms(
                "CHATHARVEST_PROFILE_FIELD_TIMEOUT_MS",
                defaults.profile_field_timeout,
            )?,
            public_handle_timeout: env_ms(
                "CHATHARVEST_PUBLIC_HANDLE_TIMEOUT_MS",
                defaults.public_handle_timeout,
            )?,
            growth_timeout: env_ms("CHATHARVEST_GROWTH_TIMEOUT_MS", defaults.growth_timeout)?,
            poll_backoff_min: defaults.poll_backoff_min,
            poll_backoff_max: defaults.poll_backoff_max,
            settle: match env::var("CHATHARVEST_SETTLE") {
                Ok(raw) => SettlePolicy::parse(&raw)?,
                Err(_) => defaults.settle,
            },
            post_backscroll_px: env_parse(
                "CHATHARVEST_POST_BACKSCROLL_PX",
                defaults.post_backscroll_px,
            )?,
            member_jiggle_up_px: defaults.member_jiggle_up_px,
            member_jiggle_down_px: defaults.member_jiggle_down_px,
            member_jiggle_rounds: defaults.member_jiggle_rounds,
        })
    }

    /// Config for in-memory drivers: no settle pauses, short waits.
    pub fn for_replay() -> Self {
        Self::default().with_replay_timing()
    }

    /// Keep targets and bounds, swap every wait for one suited to an in-memory driver.
    pub fn with_replay_timing(self) -> Self {
        Self {
            element_timeout: Duration::from_millis(50),
            profile_field_timeout: Duration::from_millis(10),
            public_handle_timeout: Duration::from_millis(10),
            growth_timeout: Duration::from_millis(10),
            poll_backoff_min: Duration::from_millis(1),
            poll_backoff_max: Duration::from_millis(2),
            settle: SettlePolicy::Immediate,
            ..self
        }
    }

    pub fn log_summary(&self) {
        info!(
            app_base_url = self.app_base_url.as_str(),
            chat_iteration_limit = self.chat_iteration_limit,
            post_iteration_limit = self.post_iteration_limit,
            subscriber_iteration_limit = self.subscriber_iteration_limit,
            default_max_posts = self.default_max_posts,
            include_archived = self.include_archived,
            settle = %self.settle,
            "Harvest config loaded"
        );
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_ms(key: &str, default: Duration) -> Result<Duration> {
    let default_ms = default.as_millis() as u64;
    env_parse(key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_collection_bounds() {
        let config = Config::default();
        assert_eq!(config.chat_iteration_limit, 1000);
        assert_eq!(config.post_iteration_limit, 1000);
        assert_eq!(config.subscriber_iteration_limit, 10_000);
        assert_eq!(
            config.settle,
            SettlePolicy::Jitter {
                min: Duration::from_millis(5000),
                max: Duration::from_millis(7000)
            }
        );
    }

    #[test]
    fn settle_policy_parses_all_forms() {
        assert_eq!(SettlePolicy::parse("none").unwrap(), SettlePolicy::Immediate);
        assert_eq!(
            SettlePolicy::parse("jitter:100-200").unwrap(),
            SettlePolicy::Jitter {
                min: Duration::from_millis(100),
                max: Duration::from_millis(200)
            }
        );
        assert_eq!(
            SettlePolicy::parse("stable: 1500 / 10000").unwrap(),
            SettlePolicy::StableCount {
                quiet: Duration::from_millis(1500),
                timeout: Duration::from_millis(10_000)
            }
        );
    }

    #[test]
    fn settle_policy_rejects_garbage() {
        assert!(SettlePolicy::parse("jitter:200-100").is_err());
        assert!(SettlePolicy::parse("stable:abc/1").is_err());
        assert!(SettlePolicy::parse("sometimes").is_err());
    }

    #[test]
    fn settle_policy_display_round_trips() {
        let policy = SettlePolicy::StableCount {
            quiet: Duration::from_millis(250),
            timeout: Duration::from_millis(4000),
        };
        assert_eq!(SettlePolicy::parse(&policy.to_string()).unwrap(), policy);
    }
}
