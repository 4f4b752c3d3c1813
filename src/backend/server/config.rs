/**
 * Server Configuration
 *
 * Settings are loaded from environment variables with sensible defaults
 * for local development. Configuration problems are logged but never
 * prevent server startup: an unparsable value degrades to its default
 * with a warning.
 *
 * # Rate-limit surfaces
 *
 * Each protected surface gets its own policy, tunable independently:
 *
 * - `GEMFLOW_API_LIMIT` / `GEMFLOW_API_WINDOW_SECS`
 * - `GEMFLOW_AUTH_LIMIT` / `GEMFLOW_AUTH_WINDOW_SECS` / `GEMFLOW_AUTH_BLOCK_SECS`
 * - `GEMFLOW_UPLOAD_LIMIT` / `GEMFLOW_UPLOAD_WINDOW_SECS`
 * - `GEMFLOW_SOCIAL_LIMIT` / `GEMFLOW_SOCIAL_WINDOW_SECS`
 * - `GEMFLOW_MESSAGING_LIMIT` / `GEMFLOW_MESSAGING_WINDOW_SECS` / `GEMFLOW_MESSAGING_BLOCK_SECS`
 *
 * # Realtime tuning
 *
 * - `GEMFLOW_TYPING_LIVENESS_SECS` - silence interval before a typing entry expires
 * - `GEMFLOW_CHANNEL_CAPACITY` - broadcast buffer per channel
 * - `GEMFLOW_CLEANUP_INTERVAL_SECS` - period of the limiter/channel cleanup task
 */

use std::str::FromStr;
use std::time::Duration;

use crate::backend::realtime::{BackoffPolicy, RateLimitPolicy};

/// Runtime settings for the coordination server
#[derive(Debug, Clone)]
pub struct Settings {
    /// General API traffic policy
    pub api_policy: RateLimitPolicy,
    /// Authentication attempt policy (blocks on violation)
    pub auth_policy: RateLimitPolicy,
    /// Upload policy
    pub upload_policy: RateLimitPolicy,
    /// Social-action policy (typing, presence)
    pub social_policy: RateLimitPolicy,
    /// Messaging policy (blocks on violation)
    pub messaging_policy: RateLimitPolicy,
    /// Silence interval after which a typing entry is presumed stale
    pub typing_liveness: Duration,
    /// Broadcast buffer size per transport channel
    pub channel_capacity: usize,
    /// Reconnect backoff for channel subscriptions
    pub backoff: BackoffPolicy,
    /// Period of the limiter and idle-channel cleanup task
    pub cleanup_interval: Duration,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_policy: RateLimitPolicy::new(
                env_or("GEMFLOW_API_LIMIT", defaults.api_policy.limit),
                secs_or("GEMFLOW_API_WINDOW_SECS", defaults.api_policy.window),
            ),
            auth_policy: RateLimitPolicy::new(
                env_or("GEMFLOW_AUTH_LIMIT", defaults.auth_policy.limit),
                secs_or("GEMFLOW_AUTH_WINDOW_SECS", defaults.auth_policy.window),
            )
            .with_block(secs_or(
                "GEMFLOW_AUTH_BLOCK_SECS",
                defaults
                    .auth_policy
                    .block_duration
                    .unwrap_or(Duration::from_secs(1800)),
            )),
            upload_policy: RateLimitPolicy::new(
                env_or("GEMFLOW_UPLOAD_LIMIT", defaults.upload_policy.limit),
                secs_or("GEMFLOW_UPLOAD_WINDOW_SECS", defaults.upload_policy.window),
            ),
            social_policy: RateLimitPolicy::new(
                env_or("GEMFLOW_SOCIAL_LIMIT", defaults.social_policy.limit),
                secs_or("GEMFLOW_SOCIAL_WINDOW_SECS", defaults.social_policy.window),
            ),
            messaging_policy: RateLimitPolicy::new(
                env_or("GEMFLOW_MESSAGING_LIMIT", defaults.messaging_policy.limit),
                secs_or(
                    "GEMFLOW_MESSAGING_WINDOW_SECS",
                    defaults.messaging_policy.window,
                ),
            )
            .with_block(secs_or(
                "GEMFLOW_MESSAGING_BLOCK_SECS",
                defaults
                    .messaging_policy
                    .block_duration
                    .unwrap_or(Duration::from_secs(300)),
            )),
            typing_liveness: secs_or("GEMFLOW_TYPING_LIVENESS_SECS", defaults.typing_liveness),
            channel_capacity: env_or("GEMFLOW_CHANNEL_CAPACITY", defaults.channel_capacity),
            backoff: defaults.backoff,
            cleanup_interval: secs_or(
                "GEMFLOW_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval,
            ),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_policy: RateLimitPolicy::new(100, Duration::from_secs(60)),
            auth_policy: RateLimitPolicy::new(5, Duration::from_secs(900))
                .with_block(Duration::from_secs(1800)),
            upload_policy: RateLimitPolicy::new(20, Duration::from_secs(3600)),
            social_policy: RateLimitPolicy::new(30, Duration::from_secs(60)),
            messaging_policy: RateLimitPolicy::new(60, Duration::from_secs(60))
                .with_block(Duration::from_secs(300)),
            typing_liveness: Duration::from_secs(5),
            channel_capacity: 1000,
            backoff: BackoffPolicy::default(),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Parse an environment variable, falling back to `default` on absence or
/// parse failure (with a warning, never a startup failure)
fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("[Config] Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Like `env_or`, for second-denominated durations
fn secs_or(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let settings = Settings::default();
        assert!(settings.auth_policy.limit < settings.api_policy.limit);
        assert!(settings.auth_policy.block_duration.is_some());
        assert!(settings.api_policy.block_duration.is_none());
        assert_eq!(settings.typing_liveness, Duration::from_secs(5));
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        // Key is unlikely to exist; absence falls back
        assert_eq!(env_or("GEMFLOW_TEST_NO_SUCH_KEY", 42usize), 42);
    }
}
