//! Cron-driven re-invocation of a sync job.
//!
//! Accepts both classic 5-field expressions (`min hour dom month dow`) and the
//! 6/7-field seconds-first form. A 5-field expression fires at second 0 and
//! reads its weekday field with crontab numbering (0 or 7 is Sunday, 1 is
//! Monday). The 6/7-field form is passed to the `cron` crate unchanged, where
//! numeric weekdays run 1 (Sunday) to 7 (Saturday).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::SyncError;

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    timezone: Tz,
}

impl CronSchedule {
    /// Parse `expression` evaluated in `timezone` (IANA name; empty means UTC).
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, SyncError> {
        let fields = expression.split_whitespace().count();
        let normalized = match fields {
            5 => {
                let parts: Vec<&str> = expression.split_whitespace().collect();
                let weekdays = crontab_weekdays(parts[4])
                    .map_err(|e| SyncError::Config(format!("cron expression {expression:?}: {e}")))?;
                format!("0 {} {weekdays}", parts[..4].join(" "))
            }
            6 | 7 => expression.trim().to_string(),
            _ => {
                return Err(SyncError::Config(format!(
                    "cron expression {expression:?} must have 5, 6 or 7 fields"
                )))
            }
        };
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| SyncError::Config(format!("invalid cron expression {expression:?}: {e}")))?;

        let timezone = match timezone.trim() {
            "" => Tz::UTC,
            name => name
                .parse::<Tz>()
                .map_err(|e| SyncError::Config(format!("unknown timezone {name:?}: {e}")))?,
        };

        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a crontab weekday field into day names for the `cron` crate.
///
/// Numeric values, ranges and steps (`1`, `5-7`, `*/2`, `1-5/2`) expand to an
/// explicit name list. Entries that already use names pass through.
fn crontab_weekdays(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }
    let mut parts = Vec::new();
    for part in field.split(',') {
        let (base, step) = match part.split_once('/') {
            Some((base, step)) => {
                let step = step
                    .parse::<usize>()
                    .ok()
                    .filter(|step| *step > 0)
                    .ok_or_else(|| format!("invalid weekday step {part:?}"))?;
                (base, step)
            }
            None => (part, 1),
        };
        if base.chars().any(|c| c.is_ascii_alphabetic()) {
            parts.push(part.to_string());
            continue;
        }
        let (start, end) = match base.split_once('-') {
            _ if base == "*" => (0, 6),
            Some((start, end)) => (weekday_number(start)?, weekday_number(end)?),
            None if step > 1 => (weekday_number(base)?, 6),
            None => {
                let day = weekday_number(base)?;
                (day, day)
            }
        };
        if start > end {
            return Err(format!("weekday range {part:?} runs backwards"));
        }
        let mut days = [false; 7];
        for day in (start..=end).step_by(step) {
            days[day % 7] = true;
        }
        parts.extend(
            days.iter()
                .zip(WEEKDAY_NAMES)
                .filter(|(on, _)| **on)
                .map(|(_, name)| name.to_string()),
        );
    }
    Ok(parts.join(","))
}

fn weekday_number(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .ok()
        .filter(|day| *day <= 7)
        .ok_or_else(|| format!("invalid weekday {value:?}, expected 0-7"))
}

/// Run `job` at every fire time of `schedule`, forever.
///
/// Each run is awaited to completion before the next fire time is computed,
/// so runs never overlap; fire times that pass during a run are skipped.
pub async fn run_scheduled<F, Fut>(schedule: &CronSchedule, job: F) -> Result<(), SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    run_with_clock(schedule, Utc::now, job).await
}

async fn run_with_clock<C, F, Fut>(
    schedule: &CronSchedule,
    clock: C,
    mut job: F,
) -> Result<(), SyncError>
where
    C: Fn() -> DateTime<Utc>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let now = clock();
        let Some(next) = schedule.next_after(now) else {
            warn!(cron = schedule.expression(), "Schedule has no further fire times");
            return Err(SyncError::Config(format!(
                "cron expression {:?} never fires again",
                schedule.expression()
            )));
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(
            next_run = %next.with_timezone(&schedule.timezone()),
            wait_secs = wait.as_secs(),
            "Next scheduled sync"
        );
        tokio::time::sleep(wait).await;
        job().await;
    }
}
