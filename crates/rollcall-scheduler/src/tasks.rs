//! Job definitions — what fires and when.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rollcall_core::config::ScheduleConfig;
use rollcall_core::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cron::CronSchedule;

/// What a trigger does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Scheduled (non-manual) poll send, guarded against same-day duplicates.
    SendPoll,
    /// Sunday reminder naming respondents and non-respondents.
    Reminder,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendPoll => f.write_str("send_poll"),
            Self::Reminder => f.write_str("reminder"),
        }
    }
}

/// A recurring wall-clock trigger.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    /// Human-readable name (config key).
    pub name: String,
    pub kind: JobKind,
    pub schedule: CronSchedule,
    /// Last fire time.
    pub last_run: Option<DateTime<Utc>>,
    /// Next fire time; `None` if the expression never matches again.
    pub next_run: Option<DateTime<Utc>>,
    /// How many times this job has fired in this process.
    pub run_count: u32,
}

impl ScheduledJob {
    /// Create a job from a cron expression. `next_run` is filled in by the engine.
    pub fn new(name: &str, kind: JobKind, expression: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            kind,
            schedule: CronSchedule::parse(expression)?,
            last_run: None,
            next_run: None,
            run_count: 0,
        })
    }

    /// Check if this job is due at `now`.
    pub fn should_run(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| now >= next)
    }

    /// Recompute `next_run` from `after` in `tz`.
    pub fn advance(&mut self, after: DateTime<Utc>, tz: Tz) {
        self.next_run = self.schedule.next_run(after, tz);
    }
}

/// The three weekly triggers from config.
pub fn jobs_from_config(config: &ScheduleConfig) -> Result<Vec<ScheduledJob>> {
    Ok(vec![
        ScheduledJob::new("send_poll", JobKind::SendPoll, &config.send_poll)?,
        ScheduledJob::new(
            "send_poll_fallback",
            JobKind::SendPoll,
            &config.send_poll_fallback,
        )?,
        ScheduledJob::new("reminder", JobKind::Reminder, &config.reminder)?,
    ])
}
