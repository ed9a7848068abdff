// src/scheduler.rs
//! Daily trigger: `Idle → Running → Idle`, weekdays only, at most once per day.
//! Polls the local wall clock at a coarse interval instead of arming timers.

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use metrics::counter;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not yet time (or a run is still in progress).
    Waiting,
    /// Scheduled time reached on a business day; run the pipeline.
    Fire,
    /// Scheduled time reached on Saturday/Sunday; nothing to do.
    Weekend,
}

#[derive(Debug, Clone)]
pub struct DailyTrigger {
    at: NaiveTime,
    next_run: NaiveDateTime,
    state: TriggerState,
}

pub fn is_business_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// First occurrence of `at` strictly after `after`.
fn next_occurrence(at: NaiveTime, after: NaiveDateTime) -> NaiveDateTime {
    let same_day = after.date().and_time(at);
    if same_day > after {
        return same_day;
    }
    after
        .date()
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(at))
        .unwrap_or(NaiveDateTime::MAX)
}

impl DailyTrigger {
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            at,
            next_run: next_occurrence(at, now),
            state: TriggerState::Idle,
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Advance the schedule for wall-clock `now`. On `Fire` the trigger enters
    /// `Running` until `finish` is called.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        if self.state == TriggerState::Running || now < self.next_run {
            return TickOutcome::Waiting;
        }
        self.next_run = next_occurrence(self.at, now);
        if is_business_day(now.weekday()) {
            self.state = TriggerState::Running;
            TickOutcome::Fire
        } else {
            TickOutcome::Weekend
        }
    }

    pub fn finish(&mut self) {
        self.state = TriggerState::Idle;
    }
}

/// Poll forever on the local wall clock; run `job` inline whenever the trigger fires.
pub async fn run_forever<F, Fut>(trigger: DailyTrigger, poll: Duration, job: F)
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ()>,
{
    run_with_clock(trigger, poll, || Local::now().naive_local(), job).await
}

/// `run_forever` with the wall clock supplied by `clock`.
pub async fn run_with_clock<C, F, Fut>(mut trigger: DailyTrigger, poll: Duration, mut clock: C, mut job: F)
where
    C: FnMut() -> NaiveDateTime,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!(next_run = %trigger.next_run(), poll_secs = poll.as_secs(), "scheduler started");

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let now = clock();
        match trigger.tick(now) {
            TickOutcome::Waiting => {}
            TickOutcome::Weekend => {
                tracing::info!(%now, "weekend, no messages today");
                counter!("scheduler_weekend_skips_total").increment(1);
            }
            TickOutcome::Fire => {
                tracing::info!(%now, "daily job started");
                counter!("scheduler_runs_total").increment(1);
                job(now.date()).await;
                trigger.finish();
                tracing::info!(next_run = %trigger.next_run(), "daily job finished");
            }
        }
    }
}
