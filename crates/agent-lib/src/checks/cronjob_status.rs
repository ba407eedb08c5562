//! CronJob status check
//!
//! Judges the latest job of a CronJob. Pending and running durations are
//! tracked per job; a new job resets both trackers.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::render;
use crate::schemata::section::{CronJobLatestJob, JobInfo, JobStatusType};
use crate::temporal::{render_with_levels, DurationTracker, Levels, ValueStore};
use crate::verdict::{CheckOutput, State};

const LATEST_JOB_UID_KEY: &str = "latest_job_uid";
const PENDING_KEY: &str = "pending";
const RUNNING_KEY: &str = "running";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_pending")]
    pub pending: Levels,
    #[serde(default)]
    pub running: Levels,
}

fn default_pending() -> Levels {
    Levels::fixed(300.0, 600.0)
}

impl Default for Params {
    fn default() -> Self {
        Self {
            pending: default_pending(),
            running: Levels::NoLevels,
        }
    }
}

fn reason_suffix(job: &JobInfo) -> String {
    match (&job.status.reason, &job.status.message) {
        (Some(reason), Some(message)) => format!(" ({reason}: {message})"),
        (Some(reason), None) => format!(" ({reason})"),
        (None, Some(message)) => format!(" ({message})"),
        (None, None) => String::new(),
    }
}

fn latest_job_result(
    params: &Params,
    job: &JobInfo,
    store: &mut dyn ValueStore,
    now: f64,
) -> CheckOutput {
    let pending = DurationTracker::new(PENDING_KEY);
    let running = DurationTracker::new(RUNNING_KEY);

    if store.get(LATEST_JOB_UID_KEY).and_then(|v| v.as_str()) != Some(job.uid.as_str()) {
        pending.reset(store);
        running.reset(store);
        store.set(LATEST_JOB_UID_KEY, json!(job.uid));
    }

    let status = job.status.type_;
    let pending_for = pending.observe(store, status == JobStatusType::Pending, now);
    let running_for = running.observe(store, status == JobStatusType::Running, now);

    let (state, text) = match (status, pending_for, running_for) {
        (JobStatusType::Pending, Some(elapsed), _) => {
            let (state, since) = render_with_levels(elapsed, &params.pending, render::timespan);
            (state, format!("Pending since {since}{}", reason_suffix(job)))
        }
        (JobStatusType::Running, _, Some(elapsed)) => {
            let (state, since) = render_with_levels(elapsed, &params.running, render::timespan);
            (state, format!("Running since {since}"))
        }
        (JobStatusType::Completed, _, _) => (State::Ok, "Completed".to_string()),
        (JobStatusType::Failed, _, _) => (State::Crit, format!("Failed{}", reason_suffix(job))),
        _ => (State::Unknown, format!("Unknown{}", reason_suffix(job))),
    };

    CheckOutput::summary(state, format!("Latest job: {text}"))
}

pub fn check(
    params: &Params,
    section: &CronJobLatestJob,
    store: &mut dyn ValueStore,
    now: f64,
) -> Vec<CheckOutput> {
    let mut outputs = Vec::new();

    match &section.latest_job {
        Some(job) => {
            outputs.push(latest_job_result(params, job, store, now));

            if let (Some(start), Some(end)) = (job.start_time, job.completion_time) {
                outputs.push(CheckOutput::summary(
                    State::Ok,
                    format!("Duration: {}", render::timespan(end - start)),
                ));
                outputs.push(CheckOutput::metric("kube_cron_job_duration", end - start, None));
            }
        }
        None => {
            outputs.push(CheckOutput::summary(State::Ok, "Latest job: none scheduled yet"));
        }
    }

    if let Some(last_successful) = section.last_successful_time {
        outputs.push(CheckOutput::summary(
            State::Ok,
            format!(
                "Time since last successful completion: {}",
                render::timespan(now - last_successful)
            ),
        ));
        outputs.push(CheckOutput::metric(
            "kube_cron_job_last_success",
            now - last_successful,
            None,
        ));
    }

    if let Some(last_schedule) = section.last_schedule_time {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!(
                "Last schedule: {} ({} ago)",
                render::datetime(last_schedule),
                render::timespan(now - last_schedule)
            ),
        ));
    }

    if section.suspend {
        outputs.push(CheckOutput::notice(State::Ok, "Schedule is suspended"));
    }

    outputs
}
