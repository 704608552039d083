//! Controller configuration

use std::time::Duration;

use crate::source::SourceKind;

/// Refresh periods offered to users, in seconds. 0 disables refresh.
pub const REFRESH_RATE_OPTIONS: [u32; 5] = [0, 5, 10, 30, 60];

/// Reconnect cooldown after a delivery failure
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect
    pub cooldown: Duration,
    /// Multiplier applied per consecutive attempt, 1.0 = fixed
    pub backoff_factor: f64,
    /// Upper bound on the delay
    pub max_delay: Duration,
    /// Give up after this many consecutive attempts, None = never
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl ReconnectPolicy {
    /// Same delay every time, retry forever
    pub fn fixed(cooldown: Duration) -> Self {
        Self {
            cooldown,
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(60).max(cooldown),
            max_attempts: None,
        }
    }

    /// Doubling delay from `cooldown` up to `max_delay`
    pub fn exponential(cooldown: Duration, max_delay: Duration) -> Self {
        Self {
            cooldown,
            backoff_factor: 2.0,
            max_delay,
            max_attempts: None,
        }
    }

    /// Cap consecutive attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before 1-based `attempt`, or None once attempts are exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }

        let factor = if self.backoff_factor.is_finite() && self.backoff_factor > 1.0 {
            self.backoff_factor
        } else {
            1.0
        };
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let cap = self.max_delay.max(self.cooldown).as_secs_f64();
        let secs = (self.cooldown.as_secs_f64() * factor.powi(exponent)).min(cap);

        Some(Duration::from_secs_f64(secs))
    }
}

/// Stream lifecycle controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Source selected at startup
    pub source_kind: SourceKind,

    /// Initial refresh period in seconds, 0 = disabled
    pub refresh_period_secs: u32,

    /// Delay between stopping the old source and starting the new one
    pub source_switch_grace: Duration,

    /// Upper bound on a single resolution
    pub resolve_timeout: Duration,

    /// Reconnect behavior after delivery failures
    pub reconnect: ReconnectPolicy,

    /// Event broadcast channel capacity
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::Proxy,
            refresh_period_secs: 0,
            source_switch_grace: Duration::from_millis(500),
            resolve_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            event_capacity: 64,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial source
    pub fn source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        self
    }

    /// Set the initial refresh period
    pub fn refresh_period_secs(mut self, secs: u32) -> Self {
        self.refresh_period_secs = secs;
        self
    }

    /// Set the source-switch grace delay
    pub fn source_switch_grace(mut self, grace: Duration) -> Self {
        self.source_switch_grace = grace;
        self
    }

    /// Set the resolution timeout
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.source_kind, SourceKind::Proxy);
        assert_eq!(config.refresh_period_secs, 0);
        assert_eq!(config.source_switch_grace, Duration::from_millis(500));
        assert_eq!(config.reconnect.cooldown, Duration::from_secs(5));
        assert_eq!(config.reconnect.max_attempts, None);
    }

    #[test]
    fn test_builder() {
        let config = ControllerConfig::new()
            .source_kind(SourceKind::Tunnel)
            .refresh_period_secs(30)
            .source_switch_grace(Duration::from_millis(100))
            .reconnect(ReconnectPolicy::fixed(Duration::from_secs(1)).max_attempts(3));

        assert_eq!(config.source_kind, SourceKind::Tunnel);
        assert_eq!(config.refresh_period_secs, 30);
        assert_eq!(config.reconnect.max_attempts, Some(3));
    }

    #[test]
    fn test_fixed_policy_never_grows() {
        let policy = ReconnectPolicy::default();
        for attempt in [1, 2, 10, 1_000] {
            assert_eq!(policy.delay_for(attempt), Some(Duration::from_secs(5)));
        }
    }

    #[test]
    fn test_exponential_policy_caps() {
        let policy = ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay_for(5), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay_for(u32::MAX), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_max_attempts() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(5)).max_attempts(2);
        assert!(policy.delay_for(2).is_some());
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn test_refresh_options() {
        assert_eq!(REFRESH_RATE_OPTIONS[0], 0);
        assert!(REFRESH_RATE_OPTIONS.windows(2).all(|w| w[0] < w[1]));
    }
}
