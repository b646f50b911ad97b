//! Scheduler Engine — the main loop that checks and fires jobs.
//! Uses tokio::interval for zero-overhead ticking (sleeps between checks).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rollcall_core::config::ScheduleConfig;
use rollcall_core::error::Result;
use std::future::Future;

use crate::tasks::{self, JobKind, ScheduledJob};

/// The scheduler engine — owns the jobs and decides which are due.
pub struct SchedulerEngine {
    jobs: Vec<ScheduledJob>,
    tz: Tz,
}

impl SchedulerEngine {
    /// Create an engine; next fire times are computed from `now`, so instants
    /// that passed while the process was down are never replayed.
    pub fn new(jobs: Vec<ScheduledJob>, tz: Tz, now: DateTime<Utc>) -> Self {
        let mut engine = Self { jobs, tz };
        for job in engine.jobs.iter_mut() {
            job.advance(now, tz);
        }
        engine
    }

    /// Build the weekly jobs from config.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let tz = config.timezone()?;
        let jobs = tasks::jobs_from_config(config)?;
        Ok(Self::new(jobs, tz, Utc::now()))
    }

    /// List all jobs.
    pub fn list_jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Get job count.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Earliest upcoming fire time across all jobs.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().filter_map(|j| j.next_run).min()
    }

    /// Tick — fire every job due at `now` and advance it.
    /// A job that is late by several periods fires once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, JobKind)> {
        let mut triggered = Vec::new();

        for job in self.jobs.iter_mut() {
            if !job.should_run(now) {
                continue;
            }

            tracing::info!("🔔 Job triggered: '{}' ({})", job.name, job.schedule);
            job.last_run = Some(now);
            job.run_count += 1;
            job.advance(now, self.tz);
            triggered.push((job.name.clone(), job.kind));
        }

        triggered
    }
}

/// Run the scheduler loop forever, awaiting `on_fire` for each due job in
/// turn so fired jobs never overlap.
pub async fn spawn_scheduler<F, Fut>(
    mut engine: SchedulerEngine,
    check_interval_secs: u64,
    on_fire: F,
) where
    F: Fn(JobKind) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    tracing::info!(
        "⏰ Scheduler started ({} jobs, tz={}, check every {}s)",
        engine.job_count(),
        engine.timezone(),
        check_interval_secs
    );
    for job in engine.list_jobs() {
        match job.next_run {
            Some(next) => tracing::info!(
                "   {} [{}] next at {}",
                job.name,
                job.schedule,
                next.with_timezone(&engine.timezone())
            ),
            None => tracing::warn!("   {} [{}] never fires", job.name, job.schedule),
        }
    }

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(check_interval_secs.max(1)));

    loop {
        interval.tick().await;

        for (name, kind) in engine.tick(Utc::now()) {
            tracing::debug!("📣 Running job '{name}'");
            on_fire(kind).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekly_engine(now: DateTime<Utc>) -> SchedulerEngine {
        let jobs = tasks::jobs_from_config(&ScheduleConfig::default()).unwrap();
        SchedulerEngine::new(jobs, Tz::Europe__Chisinau, now)
    }

    #[test]
    fn test_next_runs_computed_on_creation() {
        let engine = weekly_engine(utc(2026, 2, 26, 12, 0));
        let jobs = engine.list_jobs();
        assert_eq!(jobs[0].next_run, Some(utc(2026, 2, 28, 16, 0)));
        assert_eq!(jobs[1].next_run, Some(utc(2026, 2, 28, 21, 59)));
        assert_eq!(jobs[2].next_run, Some(utc(2026, 3, 1, 6, 0)));
        assert_eq!(engine.next_due(), Some(utc(2026, 2, 28, 16, 0)));
    }

    #[test]
    fn test_tick_fires_due_jobs_once() {
        let mut engine = weekly_engine(utc(2026, 2, 26, 12, 0));
        assert!(engine.tick(utc(2026, 2, 28, 15, 59)).is_empty());

        let fired = engine.tick(utc(2026, 2, 28, 16, 0));
        assert_eq!(fired, vec![("send_poll".to_string(), JobKind::SendPoll)]);
        assert!(engine.tick(utc(2026, 2, 28, 16, 1)).is_empty());

        let fired = engine.tick(utc(2026, 2, 28, 22, 0));
        assert_eq!(fired[0].0, "send_poll_fallback");

        let fired = engine.tick(utc(2026, 3, 1, 6, 0));
        assert_eq!(fired, vec![("reminder".to_string(), JobKind::Reminder)]);

        let job = &engine.list_jobs()[0];
        assert_eq!(job.run_count, 1);
        assert_eq!(job.next_run, Some(utc(2026, 3, 7, 16, 0)));
    }

    #[test]
    fn test_missed_instants_are_not_replayed() {
        // Process starts Sunday 10:00 local, after both Saturday sends and the reminder
        let mut engine = weekly_engine(utc(2026, 3, 1, 8, 0));
        assert!(engine.tick(utc(2026, 3, 1, 8, 0)).is_empty());
        assert_eq!(engine.list_jobs()[0].next_run, Some(utc(2026, 3, 7, 16, 0)));
    }

    #[test]
    fn test_late_tick_fires_once() {
        let mut engine = weekly_engine(utc(2026, 2, 26, 12, 0));
        // One tick a full week late: every job fires once and moves forward
        let fired = engine.tick(utc(2026, 3, 7, 17, 0));
        assert_eq!(fired.len(), 3);
        assert!(engine.list_jobs().iter().all(|j| j.next_run > Some(utc(2026, 3, 7, 17, 0))));
    }

    #[test]
    fn test_from_config_rejects_bad_timezone() {
        let config = ScheduleConfig {
            timezone: "Nowhere/City".into(),
            ..ScheduleConfig::default()
        };
        assert!(SchedulerEngine::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_loop_invokes_callback() {
        // Engine created two minutes in the past, so the first tick is already due
        let jobs = vec![ScheduledJob::new("tick", JobKind::Reminder, "* * * * *").unwrap()];
        let engine = SchedulerEngine::new(jobs, Tz::UTC, Utc::now() - chrono::Duration::minutes(2));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();

        let handle = tokio::spawn(spawn_scheduler(engine, 1, move |kind| {
            let seen = seen.clone();
            async move {
                assert_eq!(kind, JobKind::Reminder);
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        handle.abort();
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
