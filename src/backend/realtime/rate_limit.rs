//! Sliding-Window Rate Limiter
//!
//! Per-identifier admission control with temporary blocking after repeated
//! violations. Each protected surface (general API traffic, authentication,
//! uploads, social actions, messaging) gets its own limiter instance with
//! its own policy; instances never share state.
//!
//! # Algorithm
//!
//! Hits are pruned lazily on every check to those inside `[now - window,
//! now]` — there is no pruning timer. A rejection while a block policy is
//! configured escalates into a temporary full block, which stops a client
//! from oscillating exactly at the limit indefinitely.
//!
//! # Failure semantics
//!
//! `check` never fails. Without a configured `block_duration` the limiter
//! degrades to pure sliding-window throttling.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Policy for one protected surface
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum accepted hits per window
    pub limit: usize,
    /// Length of the sliding window
    pub window: Duration,
    /// Full-block duration applied after a violation, if configured
    pub block_duration: Option<Duration>,
}

impl RateLimitPolicy {
    /// Create a pure sliding-window policy
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            block_duration: None,
        }
    }

    /// Escalate violations into a temporary full block
    pub fn with_block(mut self, block_duration: Duration) -> Self {
        self.block_duration = Some(block_duration);
        self
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// The policy's limit, echoed for response headers
    pub limit: usize,
    /// Remaining quota in the current window
    pub remaining: usize,
    /// When the oldest counted hit falls out of the window (an estimate,
    /// pruning is lazy), or the block expiry while a block is in effect
    pub reset_at: Instant,
    /// Whether a temporary block is in effect
    pub blocked: bool,
    /// When the block expires, if one is in effect
    pub block_expiry: Option<Instant>,
}

impl RateLimitDecision {
    /// How long the caller should wait before retrying
    pub fn retry_after(&self, now: Instant) -> Duration {
        let until = self.block_expiry.unwrap_or(self.reset_at);
        until.saturating_duration_since(now)
    }
}

/// Per-identifier admission state
#[derive(Debug, Default)]
struct RateLimitRecord {
    /// Timestamps of hits inside the current window, oldest first
    hits: VecDeque<Instant>,
    /// While set and in the future, all requests are rejected
    blocked_until: Option<Instant>,
}

impl RateLimitRecord {
    /// Drop hits older than `now - window`
    fn prune(&mut self, now: Instant, window: Duration) {
        let cutoff = now.checked_sub(window);
        while let Some(&oldest) = self.hits.front() {
            match cutoff {
                Some(cutoff) if oldest < cutoff => {
                    self.hits.pop_front();
                }
                _ => break,
            }
        }
    }

    fn is_idle(&self, now: Instant, window: Duration) -> bool {
        let block_active = self.blocked_until.map(|until| now < until).unwrap_or(false);
        if block_active {
            return false;
        }
        match now.checked_sub(window) {
            Some(cutoff) => self.hits.iter().all(|&hit| hit < cutoff),
            None => self.hits.is_empty(),
        }
    }
}

/// Sliding-window rate limiter for one protected surface
pub struct SlidingWindowLimiter {
    policy: RateLimitPolicy,
    records: DashMap<String, RateLimitRecord>,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the given policy
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            records: DashMap::new(),
        }
    }

    /// The policy this limiter enforces
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Check whether a request from `identifier` is admitted, recording the
    /// hit when it is
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    /// `check` against an explicit clock reading
    pub fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let mut record = self.records.entry(identifier.to_string()).or_default();
        self.decide(&mut record, now, true)
    }

    /// Read-only probe: the same computation as `check` without recording a
    /// new hit
    pub fn status(&self, identifier: &str) -> RateLimitDecision {
        self.status_at(identifier, Instant::now())
    }

    /// `status` against an explicit clock reading
    pub fn status_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        match self.records.get_mut(identifier) {
            Some(mut record) => self.decide(&mut record, now, false),
            // Never-seen identifiers get the full quota without allocating
            // a record
            None => RateLimitDecision {
                allowed: true,
                limit: self.policy.limit,
                remaining: self.policy.limit,
                reset_at: now + self.policy.window,
                blocked: false,
                block_expiry: None,
            },
        }
    }

    /// Clear both hit history and any active block for an identifier
    pub fn reset(&self, identifier: &str) {
        self.records.remove(identifier);
    }

    /// Remove identifiers with no in-window hits and no active block,
    /// bounding memory growth
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    /// `cleanup` against an explicit clock reading
    pub fn cleanup_at(&self, now: Instant) {
        self.records
            .retain(|_, record| !record.is_idle(now, self.policy.window));
    }

    /// Number of tracked identifiers
    pub fn tracked_identifiers(&self) -> usize {
        self.records.len()
    }

    fn decide(
        &self,
        record: &mut RateLimitRecord,
        now: Instant,
        record_hit: bool,
    ) -> RateLimitDecision {
        // An active block rejects before any window accounting
        if let Some(until) = record.blocked_until {
            if now < until {
                return RateLimitDecision {
                    allowed: false,
                    limit: self.policy.limit,
                    remaining: 0,
                    reset_at: until,
                    blocked: true,
                    block_expiry: Some(until),
                };
            }
            record.blocked_until = None;
        }

        record.prune(now, self.policy.window);

        if record.hits.len() >= self.policy.limit {
            if record_hit {
                if let Some(block_duration) = self.policy.block_duration {
                    let until = now + block_duration;
                    record.blocked_until = Some(until);
                    tracing::warn!(
                        "[RateLimit] Identifier blocked for {:?} after exceeding {} hits per {:?}",
                        block_duration,
                        self.policy.limit,
                        self.policy.window
                    );
                }
            }
            let window_start = record.hits.front().copied().unwrap_or(now);
            // A freshly applied block supersedes the window estimate
            let reset_at = record
                .blocked_until
                .unwrap_or(window_start + self.policy.window);
            return RateLimitDecision {
                allowed: false,
                limit: self.policy.limit,
                remaining: 0,
                reset_at,
                blocked: record.blocked_until.is_some(),
                block_expiry: record.blocked_until,
            };
        }

        if record_hit {
            record.hits.push_back(now);
        }
        let window_start = record.hits.front().copied().unwrap_or(now);
        RateLimitDecision {
            allowed: true,
            limit: self.policy.limit,
            remaining: self.policy.limit - record.hits.len(),
            reset_at: window_start + self.policy.window,
            blocked: false,
            block_expiry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(limit: usize, window_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy::new(limit, Duration::from_millis(window_ms))
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = SlidingWindowLimiter::new(policy(3, 60_000));
        let now = Instant::now();

        for i in 0..3 {
            let decision = limiter.check_at("A", now + Duration::from_millis(i * 300));
            assert!(decision.allowed, "call {} should be allowed", i);
        }
        let fourth = limiter.check_at("A", now + Duration::from_millis(1000));
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert!(!fourth.blocked);
    }

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(policy(2, 1_000));
        let now = Instant::now();

        assert!(limiter.check_at("A", now).allowed);
        assert!(limiter.check_at("A", now + Duration::from_millis(100)).allowed);
        assert!(!limiter.check_at("A", now + Duration::from_millis(200)).allowed);

        // The first hit has fallen out of the window by now
        let later = now + Duration::from_millis(1_100);
        assert!(limiter.check_at("A", later).allowed);
    }

    #[test]
    fn test_block_escalation() {
        let limiter = SlidingWindowLimiter::new(
            policy(1, 1_000).with_block(Duration::from_millis(5_000)),
        );
        let now = Instant::now();

        assert!(limiter.check_at("A", now).allowed);
        let violation = limiter.check_at("A", now + Duration::from_millis(10));
        assert!(!violation.allowed);
        assert!(violation.blocked);
        assert!(violation.block_expiry.is_some());

        // Blocked regardless of the window having slid past the hits
        let during_block = limiter.check_at("A", now + Duration::from_millis(3_000));
        assert!(!during_block.allowed);
        assert!(during_block.blocked);

        let after_block = limiter.check_at("A", now + Duration::from_millis(5_100));
        assert!(after_block.allowed);
    }

    #[test]
    fn test_no_block_without_policy() {
        let limiter = SlidingWindowLimiter::new(policy(1, 1_000));
        let now = Instant::now();

        assert!(limiter.check_at("A", now).allowed);
        let rejected = limiter.check_at("A", now + Duration::from_millis(10));
        assert!(!rejected.allowed);
        assert!(!rejected.blocked);
        assert!(rejected.block_expiry.is_none());
    }

    #[test]
    fn test_reset_clears_hits_and_block() {
        let limiter = SlidingWindowLimiter::new(
            policy(1, 60_000).with_block(Duration::from_secs(600)),
        );
        let now = Instant::now();

        limiter.check_at("A", now);
        assert!(!limiter.check_at("A", now).allowed);

        limiter.reset("A");
        let decision = limiter.check_at("A", now);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, limiter.policy().limit - 1);
    }

    #[test]
    fn test_status_does_not_record_a_hit() {
        let limiter = SlidingWindowLimiter::new(policy(2, 60_000));
        let now = Instant::now();

        limiter.check_at("A", now);
        for _ in 0..10 {
            let probe = limiter.status_at("A", now);
            assert!(probe.allowed);
            assert_eq!(probe.remaining, 1);
        }
        assert!(limiter.check_at("A", now).allowed);
    }

    #[test]
    fn test_status_on_unseen_identifier_allocates_nothing() {
        let limiter = SlidingWindowLimiter::new(policy(3, 60_000));
        let now = Instant::now();

        let probe = limiter.status_at("ghost", now);
        assert!(probe.allowed);
        assert_eq!(probe.remaining, 3);
        assert_eq!(probe.reset_at, now + Duration::from_millis(60_000));
        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn test_blocking_rejection_resets_at_block_expiry() {
        let limiter = SlidingWindowLimiter::new(
            policy(1, 1_000).with_block(Duration::from_millis(8_000)),
        );
        let now = Instant::now();

        limiter.check_at("A", now);
        let violation = limiter.check_at("A", now + Duration::from_millis(100));
        assert!(violation.blocked);
        // reset_at and the block expiry agree on the rejection that applies
        // the block, so Retry-After and the reset header tell one story
        assert_eq!(violation.reset_at, violation.block_expiry.unwrap());
        assert_eq!(
            violation.reset_at,
            now + Duration::from_millis(100) + Duration::from_millis(8_000)
        );
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = SlidingWindowLimiter::new(policy(1, 60_000));
        let now = Instant::now();

        assert!(limiter.check_at("A", now).allowed);
        assert!(!limiter.check_at("A", now).allowed);
        assert!(limiter.check_at("B", now).allowed);
    }

    #[test]
    fn test_reset_at_tracks_oldest_hit() {
        let limiter = SlidingWindowLimiter::new(policy(5, 10_000));
        let now = Instant::now();

        let first = limiter.check_at("A", now);
        assert_eq!(first.reset_at, now + Duration::from_millis(10_000));

        let second = limiter.check_at("A", now + Duration::from_millis(2_000));
        // Still anchored to the oldest hit
        assert_eq!(second.reset_at, now + Duration::from_millis(10_000));
    }

    #[test]
    fn test_cleanup_drops_idle_records() {
        let limiter = SlidingWindowLimiter::new(
            policy(1, 1_000).with_block(Duration::from_millis(5_000)),
        );
        let now = Instant::now();

        limiter.check_at("idle", now);
        limiter.check_at("blocked", now);
        limiter.check_at("blocked", now + Duration::from_millis(10));
        assert_eq!(limiter.tracked_identifiers(), 2);

        // "idle" has no in-window hits; "blocked" still has an active block
        limiter.cleanup_at(now + Duration::from_millis(2_000));
        assert_eq!(limiter.tracked_identifiers(), 1);

        limiter.cleanup_at(now + Duration::from_millis(10_000));
        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn test_retry_after_uses_block_expiry_when_blocked() {
        let limiter = SlidingWindowLimiter::new(
            policy(1, 1_000).with_block(Duration::from_millis(8_000)),
        );
        let now = Instant::now();

        limiter.check_at("A", now);
        let decision = limiter.check_at("A", now + Duration::from_millis(100));
        assert_eq!(
            decision.retry_after(now + Duration::from_millis(100)),
            Duration::from_millis(8_000)
        );
    }
}
