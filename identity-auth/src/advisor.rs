//! Client-side expiry advisor.
//!
//! A login client caches the server-reported access-token expiry purely to
//! decide when to proactively ping the backend (which refreshes inline).
//! The advisor is an optimization, never a trust boundary: the server-side
//! session gate remains authoritative, and a client whose clock disagrees
//! only mistimes its pings.

use chrono::{DateTime, Duration, Utc};

/// Default seconds before expiry at which a ping becomes worthwhile.
const REFRESH_THRESHOLD_SECS: i64 = 300;

/// Default minimum seconds between ping attempts.
const MIN_PING_INTERVAL_SECS: i64 = 30;

/// Tracks a locally cached expiry estimate for the current login.
#[derive(Debug, Clone, Default)]
pub struct ExpiryAdvisor {
    expires_at: Option<DateTime<Utc>>,
    last_ping_at: Option<DateTime<Utc>>,
}

impl ExpiryAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the expiry reported by the server (from a login or `/auth/me`
    /// response).
    pub fn record(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = Some(expires_at);
    }

    /// Forget everything, e.g. after logout or a 401.
    pub fn clear(&mut self) {
        self.expires_at = None;
        self.last_ping_at = None;
    }

    /// True once the cached estimate says the access token has expired.
    /// With no estimate recorded the advisor stays quiet and lets the
    /// backend decide.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// True when a proactive ping to the backend is worthwhile: the cached
    /// expiry is within the refresh threshold and no ping was started in
    /// the last 30 seconds.
    pub fn should_ping(&self, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };

        if expires_at > now + Duration::seconds(REFRESH_THRESHOLD_SECS) {
            return false;
        }

        match self.last_ping_at {
            Some(last) => now - last >= Duration::seconds(MIN_PING_INTERVAL_SECS),
            None => true,
        }
    }

    /// Record that a ping was started, suppressing concurrent attempts.
    pub fn mark_ping_started(&mut self, now: DateTime<Utc>) {
        self.last_ping_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_estimate_means_no_ping() {
        let advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        assert!(!advisor.should_ping(now));
        assert!(!advisor.is_expired(now));
    }

    #[test]
    fn no_ping_while_token_is_comfortably_fresh() {
        let mut advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        advisor.record(now + Duration::hours(1));
        assert!(!advisor.should_ping(now));
    }

    #[test]
    fn ping_inside_the_threshold() {
        let mut advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        advisor.record(now + Duration::minutes(2));
        assert!(advisor.should_ping(now));
        assert!(!advisor.is_expired(now));
    }

    #[test]
    fn recent_ping_suppresses_the_next_one() {
        let mut advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        advisor.record(now + Duration::minutes(2));
        advisor.mark_ping_started(now);

        assert!(!advisor.should_ping(now + Duration::seconds(10)));
        assert!(advisor.should_ping(now + Duration::seconds(31)));
    }

    #[test]
    fn expired_estimate_reports_expired_and_still_pings() {
        let mut advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        advisor.record(now - Duration::minutes(10));
        assert!(advisor.is_expired(now));
        assert!(advisor.should_ping(now));
    }

    #[test]
    fn clear_forgets_the_estimate() {
        let mut advisor = ExpiryAdvisor::new();
        let now = Utc::now();
        advisor.record(now + Duration::minutes(2));
        advisor.clear();
        assert!(!advisor.should_ping(now));
    }
}
