//! Checkin-day boundary logic in the service's reference timezone.
//!
//! "Today" is defined by the portal's operating timezone, not the caller's
//! locale; a caller in UTC and one in UTC+8 must agree on whether an account
//! already checked in. The ledger applies the same filter server-side — the
//! functions here re-verify locally so a misbehaving backend can never cause
//! a same-day double checkin.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::types::Account;

/// Calendar date of `at` in the reference timezone, as `YYYY-MM-DD`.
#[must_use]
pub fn reference_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Whether two instants fall on the same calendar day in the reference
/// timezone.
#[must_use]
pub fn same_reference_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    a.with_timezone(&tz).date_naive() == b.with_timezone(&tz).date_naive()
}

/// Whether the account already has a successful checkin recorded for the
/// current reference-timezone day.
#[must_use]
pub fn checked_in_today(account: &Account, now: DateTime<Utc>, tz: Tz) -> bool {
    account
        .checkin_date
        .is_some_and(|at| same_reference_day(at, now, tz))
}

/// Local re-check of the server-side eligibility filter.
///
/// Covers the conditions derivable from the account record itself (sold
/// state, session liveness, day boundary); owning-user state is only known
/// to the ledger.
#[must_use]
pub fn is_due_for_checkin(account: &Account, now: DateTime<Utc>, tz: Tz) -> bool {
    !account.is_sold && !account.has_live_session(now) && !checked_in_today(account, now, tz)
}
