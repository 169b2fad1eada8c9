// Giveaway Bot - Scheduled jobs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{ScheduleConfig, TimeOfDay};
use crate::error::GiveawayResult;
use crate::notice::Notice;
use crate::processor::GiveawayProcessor;

/// Recurring jobs driven by the wall clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Job {
    /// Show the entrant count in the bot presence
    StatusRefresh,
    /// Relog the trading session if it dropped
    HealthCheck,
    /// Unconditional relog ahead of the rollover
    SessionRefresh,
    Rollover,
    Reminder,
}

impl Job {
    pub const ALL: [Job; 5] = [
        Job::StatusRefresh,
        Job::HealthCheck,
        Job::SessionRefresh,
        Job::Rollover,
        Job::Reminder,
    ];
}

fn at(date: NaiveDate, time: TimeOfDay) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(time.hour, time.minute, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

fn start_of_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    at(t.date_naive(), TimeOfDay::new(t.hour(), t.minute()))
}

#[derive(Clone, Debug)]
pub struct Schedule {
    config: ScheduleConfig,
}

impl Schedule {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// First firing of `job` strictly after `after`
    pub fn next_fire(&self, job: Job, after: DateTime<Utc>) -> DateTime<Utc> {
        let c = &self.config;
        match job {
            Job::StatusRefresh => {
                let every = c.status_every_minutes.max(1);
                let mut t = start_of_minute(after) + Duration::minutes(1);
                while t.minute() % every != 0 {
                    t += Duration::minutes(1);
                }
                t
            }
            Job::HealthCheck => {
                let t = at(after.date_naive(), TimeOfDay::new(after.hour(), c.health_check_minute));
                if t > after {
                    t
                } else {
                    t + Duration::hours(1)
                }
            }
            Job::SessionRefresh => next_daily(c.session_refresh, after),
            Job::Rollover => next_daily(c.rollover, after),
            Job::Reminder => {
                let today = after.weekday().num_days_from_monday() as i64;
                let target = c.reminder_day.num_days_from_monday() as i64;
                let t = at(after.date_naive(), c.reminder) + Duration::days((target - today).rem_euclid(7));
                if t > after {
                    t
                } else {
                    t + Duration::days(7)
                }
            }
        }
    }

    /// The earliest upcoming firing and every job due at that instant
    pub fn next_due(&self, after: DateTime<Utc>) -> (DateTime<Utc>, Vec<Job>) {
        let fires: Vec<(Job, DateTime<Utc>)> =
            Job::ALL.into_iter().map(|job| (job, self.next_fire(job, after))).collect();
        let earliest = fires.iter().map(|(_, t)| *t).min().unwrap_or(after);
        let due = fires
            .into_iter()
            .filter(|(_, t)| *t == earliest)
            .map(|(job, _)| job)
            .collect();
        (earliest, due)
    }
}

fn next_daily(time: TimeOfDay, after: DateTime<Utc>) -> DateTime<Utc> {
    let t = at(after.date_naive(), time);
    if t > after {
        t
    } else {
        t + Duration::days(1)
    }
}

/// Sleep until each job is due and run it on its own task. Never returns.
pub async fn run_schedule(processor: Arc<GiveawayProcessor>, schedule: Schedule) {
    loop {
        let now = processor.clock.now();
        let (due_at, jobs) = schedule.next_due(now);
        let wait = (due_at - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        for job in jobs {
            let processor = processor.clone();
            tokio::spawn(async move {
                if let Err(e) = processor.run_job(job).await {
                    error!("Scheduled job {:?} failed: {}", job, e);
                }
            });
        }
    }
}

impl GiveawayProcessor {
    pub async fn run_job(&self, job: Job) -> GiveawayResult<()> {
        info!("{} Running scheduled job {:?}", self.clock.now(), job);
        match job {
            Job::StatusRefresh => {
                self.refresh_status().await;
            }
            Job::HealthCheck => {
                self.session.health_check().await;
            }
            Job::SessionRefresh => {
                self.session.reconnect("refresh before picking winner").await;
            }
            Job::Rollover => {
                self.run_rollover().await?;
            }
            Job::Reminder => {
                self.send_weekly_reminder().await?;
            }
        }
        Ok(())
    }

    /// Put the entrant count in the presence line; 0 when the count fails
    pub async fn refresh_status(&self) -> String {
        let count = match self.store.count_entrants().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Could not count entrants: {}", e);
                0
            }
        };
        let text = format!("{}help | {} Entries!", self.config.prefix, count);
        if let Err(e) = self.gateway.set_presence(text.clone()).await {
            warn!("Could not update presence: {}", e);
        }
        text
    }

    /// Remind every candidate with a destination. `None` when a second trigger
    /// landed inside the guard window.
    pub async fn send_weekly_reminder(&self) -> GiveawayResult<Option<usize>> {
        if !self.reminder_guard.try_fire(self.clock.now()) {
            warn!("Double reminder, canceling task");
            return Ok(None);
        }
        info!("Sending mass reminder DM");
        let holders = self.store.destination_holders().await?;
        Ok(Some(self.notify_all(holders, Notice::Reminder).await))
    }
}
