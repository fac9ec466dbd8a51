//! CronSchedule and CronTask.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::{CronError, CronResult};
use crate::field::{CronField, FieldKind};

/// The five parsed fields of a cron expression.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CronSchedule {
    fields: [CronField; 5],
}

impl CronSchedule {
    /// Parse a whitespace-separated `minute hour day month weekday` string.
    pub fn parse(expr: &str) -> CronResult<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = parts[..] else {
            return Err(CronError::FieldCount { found: parts.len() });
        };
        Self::from_fields(minute, hour, day, month, weekday)
    }

    /// Build a schedule from five separate field strings.
    pub fn from_fields(
        minute: &str,
        hour: &str,
        day: &str,
        month: &str,
        weekday: &str,
    ) -> CronResult<Self> {
        Ok(Self {
            fields: [
                CronField::parse(FieldKind::Minute, minute)?,
                CronField::parse(FieldKind::Hour, hour)?,
                CronField::parse(FieldKind::Day, day)?,
                CronField::parse(FieldKind::Month, month)?,
                CronField::parse(FieldKind::Weekday, weekday)?,
            ],
        })
    }

    /// Get one field.
    pub fn field(&self, kind: FieldKind) -> &CronField {
        let index = FieldKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.fields[index]
    }

    /// All fields in expression order.
    pub fn fields(&self) -> &[CronField; 5] {
        &self.fields
    }

    /// True iff every field allows the corresponding part of `now`.
    /// Weekdays count from Sunday = 0.
    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        let [minute, hour, day, month, weekday] = &self.fields;
        minute.contains(now.minute())
            && hour.contains(now.hour())
            && day.contains(now.day())
            && month.contains(now.month())
            && weekday.contains(now.weekday().num_days_from_sunday())
    }

    /// True when at least one field is empty, so nothing ever matches.
    pub fn is_never(&self) -> bool {
        self.fields.iter().any(CronField::is_empty)
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CronSchedule");
        for field in &self.fields {
            s.field(field.kind().name(), &field.values());
        }
        s.finish()
    }
}

const NEVER_FIRED: i64 = i64::MIN;

/// A schedule bound to an action.
///
/// Fires on every check whose time matches the schedule. With
/// [`CronTask::once_per_minute`] it fires at most once per matching minute
/// instead.
pub struct CronTask {
    expr: String,
    schedule: CronSchedule,
    action: Arc<dyn Fn() + Send + Sync>,
    once_per_minute: bool,
    last_fired_minute: AtomicI64,
}

impl CronTask {
    /// Parse `expr` and bind `action` to it.
    pub fn parse<F>(expr: &str, action: F) -> CronResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let schedule = CronSchedule::parse(expr)?;
        Ok(Self::new(expr.trim().to_string(), schedule, action))
    }

    /// Build a task from five separate field strings.
    pub fn from_fields<F>(
        minute: &str,
        hour: &str,
        day: &str,
        month: &str,
        weekday: &str,
        action: F,
    ) -> CronResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let schedule = CronSchedule::from_fields(minute, hour, day, month, weekday)?;
        let expr = [minute, hour, day, month, weekday]
            .map(str::trim)
            .join(" ");
        Ok(Self::new(expr, schedule, action))
    }

    fn new<F>(expr: String, schedule: CronSchedule, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            expr,
            schedule,
            action: Arc::new(action),
            once_per_minute: false,
            last_fired_minute: AtomicI64::new(NEVER_FIRED),
        }
    }

    /// Fire at most once per matching minute, however often it is checked.
    pub fn once_per_minute(mut self) -> Self {
        self.once_per_minute = true;
        self
    }

    /// Whether [`CronTask::once_per_minute`] is in effect.
    pub fn is_once_per_minute(&self) -> bool {
        self.once_per_minute
    }

    /// The expression as written.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Get the parsed schedule.
    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }

    /// True iff all five fields match `now`.
    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        self.schedule.matches(now)
    }

    /// Run the action iff `now` matches. A task built with
    /// [`CronTask::once_per_minute`] also skips minutes it already fired in.
    ///
    /// Returns whether the action ran.
    pub fn check_task_time(&self, now: &NaiveDateTime) -> bool {
        if !self.matches(now) {
            return false;
        }
        if self.once_per_minute {
            let minute = now.and_utc().timestamp().div_euclid(60);
            if self.last_fired_minute.swap(minute, Ordering::SeqCst) == minute {
                return false;
            }
        }
        (self.action)();
        true
    }
}

impl fmt::Debug for CronTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronTask")
            .field("expr", &self.expr)
            .field("schedule", &self.schedule)
            .field("once_per_minute", &self.once_per_minute)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
