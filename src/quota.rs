//! Daily API quota accounting.
//!
//! The YouTube Data API bills quota per call attempt (not per success) and
//! resets the daily budget at midnight Pacific time, regardless of where the
//! client runs. This tracker mirrors that model: it never blocks a call, it
//! only accounts and reports.

use chrono::{DateTime, Days, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use chrono_tz::Tz;

/// Time zone anchoring the remote service's quota boundary.
const QUOTA_TZ: Tz = Los_Angeles;

/// The three playlist operations, each with a fixed published quota cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    List,
    Insert,
    Delete,
}

impl ApiOperation {
    /// Published per-call cost in quota units.
    pub fn cost(&self) -> u32 {
        match self {
            ApiOperation::List => 1,
            ApiOperation::Insert => 50,
            ApiOperation::Delete => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiOperation::List => "list",
            ApiOperation::Insert => "insert",
            ApiOperation::Delete => "delete",
        }
    }
}

/// Next occurrence of 00:00 Pacific strictly after `now`, in UTC.
fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(&QUOTA_TZ).date_naive();
    (local_date + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| QUOTA_TZ.from_local_datetime(&midnight).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now + chrono::Duration::days(1))
}

/// Tracks quota consumption within the current daily epoch.
///
/// Invariant: `used` is monotonically non-decreasing between resets, and no
/// read or write ever observes stale usage across the reset boundary — both
/// `record` and `remaining` apply the reset check first.
#[derive(Debug)]
pub struct QuotaTracker {
    limit: u32,
    used: u32,
    reset_at: DateTime<Utc>,
}

impl QuotaTracker {
    pub fn new(limit: u32) -> Self {
        Self::new_at(limit, Utc::now())
    }

    pub fn new_at(limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            limit,
            used: 0,
            reset_at: next_reset_after(now),
        }
    }

    /// Record one call attempt's cost.
    pub fn record(&mut self, op: ApiOperation) {
        self.record_at(op, Utc::now());
    }

    pub fn record_at(&mut self, op: ApiOperation, now: DateTime<Utc>) {
        self.check_reset(now);
        self.used = self.used.saturating_add(op.cost());
        crate::metrics::set_quota_gauges(self.used, self.remaining_unclamped());
        tracing::debug!(
            operation = op.as_str(),
            cost = op.cost(),
            used = self.used,
            limit = self.limit,
            "Quota recorded"
        );
    }

    /// Remaining units in the current epoch, clamped at 0.
    pub fn remaining(&mut self) -> u32 {
        self.remaining_at(Utc::now())
    }

    pub fn remaining_at(&mut self, now: DateTime<Utc>) -> u32 {
        self.check_reset(now);
        self.remaining_unclamped()
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[cfg(test)]
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    fn remaining_unclamped(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    fn check_reset(&mut self, now: DateTime<Utc>) {
        if now >= self.reset_at {
            tracing::info!("Quota reset - new day started");
            self.used = 0;
            self.reset_at = next_reset_after(now);
        }
    }
}
