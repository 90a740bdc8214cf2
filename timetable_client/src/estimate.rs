//! Local duration estimate and simulated progress for a generation job.
//!
//! The backend reports no incremental progress, so everything here is
//! derived from the class count and the launch timestamp.

use std::time::Duration;

/// Added to the estimate before the result is fetched.
pub const SAFETY_MARGIN_SECS: u64 = 3;

/// Expected solver run time, quadratic in the number of classes.
pub fn estimated_duration_seconds(class_count: u32) -> u64 {
    let c = u64::from(class_count);
    3 * c * c + 2 * c + 30
}

pub fn adjusted_duration_seconds(estimated_seconds: u64) -> u64 {
    estimated_seconds + SAFETY_MARGIN_SECS
}

/// Instant (ms since epoch) from which the job result may be fetched.
pub fn deadline_millis(start_timestamp: i64, estimated_seconds: u64) -> i64 {
    let adjusted_ms = adjusted_duration_seconds(estimated_seconds).saturating_mul(1000);
    start_timestamp.saturating_add(i64::try_from(adjusted_ms).unwrap_or(i64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: Duration,
    pub total: Duration,
}

impl Progress {
    pub fn at(start_timestamp: i64, estimated_seconds: u64, now_millis: i64) -> Self {
        let elapsed_ms = u64::try_from(now_millis.saturating_sub(start_timestamp)).unwrap_or(0);
        Self {
            elapsed: Duration::from_millis(elapsed_ms),
            total: Duration::from_secs(adjusted_duration_seconds(estimated_seconds)),
        }
    }

    pub fn percent(&self) -> u8 {
        if self.total.is_zero() {
            return 100;
        }
        let ratio = self.elapsed.as_millis() * 100 / self.total.as_millis();
        ratio.min(100) as u8
    }

    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed)
    }

    /// Remaining time as `mm:ss`, rounded up to the next second.
    pub fn remaining_label(&self) -> String {
        let remaining = self.remaining();
        let mut secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs += 1;
        }
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    pub fn bar(&self, width: usize) -> String {
        let filled = width * usize::from(self.percent()) / 100;
        format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
    }
}
