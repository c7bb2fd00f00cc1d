use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAILY_LIMIT: u32 = 2;
pub const DEFAULT_MONTHLY_LIMIT: u32 = 5;

fn daily_window() -> Duration {
    Duration::hours(24)
}

fn monthly_window() -> Duration {
    Duration::days(30)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitType {
    Daily,
    Monthly,
}

impl LimitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::Daily => "daily",
            LimitType::Monthly => "monthly",
        }
    }
}

/// Result of a quota check. `None` remaining counts mean unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitCheck {
    pub allowed: bool,
    pub limit_type: Option<LimitType>,
    pub remaining_daily: Option<u32>,
    pub remaining_monthly: Option<u32>,
}

impl LimitCheck {
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            limit_type: None,
            remaining_daily: None,
            remaining_monthly: None,
        }
    }

    pub fn denied(limit_type: LimitType, remaining_daily: u32, remaining_monthly: u32) -> Self {
        Self {
            allowed: false,
            limit_type: Some(limit_type),
            remaining_daily: Some(remaining_daily),
            remaining_monthly: Some(remaining_monthly),
        }
    }

    /// Unknown users fail closed.
    pub fn unknown_user() -> Self {
        Self::denied(LimitType::Daily, 0, 0)
    }
}

/// Per-user counters as persisted alongside the user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub unlimited: bool,
    pub daily_count: u32,
    pub monthly_count: u32,
    pub last_daily_reset: DateTime<Utc>,
    pub last_monthly_reset: DateTime<Utc>,
}

impl Usage {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            unlimited: false,
            daily_count: 0,
            monthly_count: 0,
            last_daily_reset: now,
            last_monthly_reset: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub daily_limit: u32,
    pub monthly_limit: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
        }
    }
}

impl QuotaPolicy {
    pub fn new(daily_limit: u32, monthly_limit: u32) -> Self {
        Self { daily_limit, monthly_limit }
    }

    /// Zero any counter whose window has elapsed. Returns true if `usage` changed.
    pub fn roll_windows(&self, usage: &mut Usage, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if now - usage.last_daily_reset >= daily_window() {
            usage.daily_count = 0;
            usage.last_daily_reset = now;
            changed = true;
        }

        if now - usage.last_monthly_reset >= monthly_window() {
            usage.monthly_count = 0;
            usage.last_monthly_reset = now;
            changed = true;
        }

        changed
    }

    /// Roll expired windows, then compare counters against the caps.
    /// Unlimited users bypass the window logic and leave `usage` untouched.
    pub fn evaluate(&self, usage: &mut Usage, now: DateTime<Utc>) -> LimitCheck {
        if usage.unlimited {
            return LimitCheck::unlimited();
        }

        self.roll_windows(usage, now);

        let remaining_daily = self.daily_limit.saturating_sub(usage.daily_count);
        let remaining_monthly = self.monthly_limit.saturating_sub(usage.monthly_count);

        if usage.daily_count >= self.daily_limit {
            return LimitCheck::denied(LimitType::Daily, 0, remaining_monthly);
        }

        if usage.monthly_count >= self.monthly_limit {
            return LimitCheck::denied(LimitType::Monthly, remaining_daily, 0);
        }

        LimitCheck {
            allowed: true,
            limit_type: None,
            remaining_daily: Some(remaining_daily),
            remaining_monthly: Some(remaining_monthly),
        }
    }

    pub fn consume(usage: &mut Usage) {
        usage.daily_count = usage.daily_count.saturating_add(1);
        usage.monthly_count = usage.monthly_count.saturating_add(1);
    }

    pub fn denial_message(&self, limit_type: LimitType) -> String {
        match limit_type {
            LimitType::Daily => format!(
                "You've reached your daily limit of {} decisions. Try again tomorrow or upgrade to Pro for unlimited access.",
                self.daily_limit
            ),
            LimitType::Monthly => format!(
                "You've reached your monthly limit of {} decisions. Upgrade to Pro for unlimited access.",
                self.monthly_limit
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(daily: u32, monthly: u32, daily_age: Duration, monthly_age: Duration) -> (Usage, DateTime<Utc>) {
        let now = Utc::now();
        let usage = Usage {
            unlimited: false,
            daily_count: daily,
            monthly_count: monthly,
            last_daily_reset: now - daily_age,
            last_monthly_reset: now - monthly_age,
        };
        (usage, now)
    }

    #[test]
    fn test_allows_under_limits() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(1, 3, Duration::hours(1), Duration::days(2));

        let check = policy.evaluate(&mut u, now);
        assert!(check.allowed);
        assert_eq!(check.limit_type, None);
        assert_eq!(check.remaining_daily, Some(1));
        assert_eq!(check.remaining_monthly, Some(2));
    }

    #[test]
    fn test_daily_cap_checked_before_monthly() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(2, 5, Duration::hours(1), Duration::days(1));

        let check = policy.evaluate(&mut u, now);
        assert!(!check.allowed);
        assert_eq!(check.limit_type, Some(LimitType::Daily));
        assert_eq!(check.remaining_daily, Some(0));
        assert_eq!(check.remaining_monthly, Some(0));
    }

    #[test]
    fn test_monthly_cap() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(0, 5, Duration::hours(30), Duration::days(10));

        let check = policy.evaluate(&mut u, now);
        assert!(!check.allowed);
        assert_eq!(check.limit_type, Some(LimitType::Monthly));
        assert_eq!(check.remaining_daily, Some(2));
    }

    #[test]
    fn test_daily_window_resets_after_24_hours() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(7, 1, Duration::hours(24), Duration::days(1));

        let check = policy.evaluate(&mut u, now);
        assert!(check.allowed);
        assert_eq!(u.daily_count, 0);
        assert_eq!(u.last_daily_reset, now);
        assert_eq!(u.monthly_count, 1);
    }

    #[test]
    fn test_window_not_reset_just_before_boundary() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(2, 2, Duration::hours(24) - Duration::seconds(1), Duration::days(1));

        assert!(!policy.roll_windows(&mut u, now));
        assert!(!policy.evaluate(&mut u, now).allowed);
    }

    #[test]
    fn test_monthly_window_resets_after_30_days() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(0, 5, Duration::days(31), Duration::days(30));

        let check = policy.evaluate(&mut u, now);
        assert!(check.allowed);
        assert_eq!(u.monthly_count, 0);
        assert_eq!(check.remaining_monthly, Some(5));
    }

    #[test]
    fn test_unlimited_bypasses_windows() {
        let policy = QuotaPolicy::default();
        let (mut u, now) = usage(50, 500, Duration::days(90), Duration::days(90));
        u.unlimited = true;
        let before = u.clone();

        let check = policy.evaluate(&mut u, now);
        assert_eq!(check, LimitCheck::unlimited());
        assert_eq!(u, before);
    }

    #[test]
    fn test_consume_then_deny() {
        let policy = QuotaPolicy::new(2, 10);
        let now = Utc::now();
        let mut u = Usage::fresh(now);

        for _ in 0..2 {
            assert!(policy.evaluate(&mut u, now).allowed);
            QuotaPolicy::consume(&mut u);
        }

        let check = policy.evaluate(&mut u, now);
        assert!(!check.allowed);
        assert_eq!(check.limit_type, Some(LimitType::Daily));
    }

    #[test]
    fn test_denial_messages_name_the_limit() {
        let policy = QuotaPolicy::new(3, 12);
        assert!(policy.denial_message(LimitType::Daily).contains("daily limit of 3"));
        assert!(policy.denial_message(LimitType::Monthly).contains("monthly limit of 12"));
    }
}
