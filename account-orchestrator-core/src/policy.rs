//! Tunable orchestration policies.

use std::time::Duration;

use chrono_tz::Tz;

/// Default pause bounds between two accounts in one checkin run.
const INTER_ACCOUNT_PAUSE_MIN_SECS: u64 = 3;
const INTER_ACCOUNT_PAUSE_MAX_SECS: u64 = 8;

/// Checkin orchestration policy.
#[derive(Debug, Clone)]
pub struct CheckinPolicy {
    /// Timezone whose calendar day defines the checkin boundary. This is
    /// the portal's operating timezone, never the caller's locale.
    pub reference_timezone: Tz,
    /// Assumed session lifetime when the portal reports no explicit expiry.
    pub session_ttl: chrono::Duration,
    /// Randomized pause bounds between accounts, keeping the run under the
    /// portal's abuse-detection thresholds.
    pub inter_account_pause: (Duration, Duration),
}

impl Default for CheckinPolicy {
    fn default() -> Self {
        Self {
            reference_timezone: chrono_tz::Asia::Shanghai,
            session_ttl: chrono::Duration::hours(24),
            inter_account_pause: (
                Duration::from_secs(INTER_ACCOUNT_PAUSE_MIN_SECS),
                Duration::from_secs(INTER_ACCOUNT_PAUSE_MAX_SECS),
            ),
        }
    }
}

/// Password-rotation policy.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Carried-in error count at which a duplicate-username rejection earns
    /// one suffix-mutated retry. Mirrors the external scheduler, which has
    /// already retried the request that many times before this branch is
    /// reachable.
    pub conflict_retry_threshold: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            conflict_retry_threshold: 2,
        }
    }
}
