//! Periodic crawl scheduling

use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Time from `now` until the next occurrence of `hour`:00 in `now`'s time zone
///
/// If `now` is exactly on the hour the next occurrence is a day later.
/// Computed on wall-clock time, so a DST shift may move the result by an hour.
pub fn delay_until_hour<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Duration {
    let local = now.naive_local();
    let Some(today) = local.date().and_hms_opt(hour.min(23), 0, 0) else {
        return Duration::ZERO;
    };
    let next = if today > local {
        today
    } else {
        today + ChronoDuration::days(1)
    };

    (next - local).to_std().unwrap_or(Duration::ZERO)
}

/// Cancellation handle for the recurring crawl task
///
/// Dropping the handle aborts the task.
#[derive(Debug)]
pub struct ScheduleHandle {
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
