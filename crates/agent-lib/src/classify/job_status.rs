//! Job status classification

use crate::classify::container_status::pod_status_message_of;
use crate::error::{EvalError, EvalResult};
use crate::schemata::api::{ConditionStatus, Job, JobCondition, JobConditionType, Phase, Pod};
use crate::schemata::section::{JobStatusInfo, JobStatusType};

fn true_condition<'a>(job: &'a Job, types: &[JobConditionType]) -> Option<&'a JobCondition> {
    job.status
        .conditions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|condition| {
            condition.status == ConditionStatus::True && types.contains(&condition.type_)
        })
}

fn from_condition(type_: JobStatusType, condition: &JobCondition) -> JobStatusInfo {
    JobStatusInfo {
        type_,
        reason: condition.reason.clone(),
        message: condition.message.clone(),
    }
}

/// Classify the status of `job` given the pods it created
///
/// Terminal conditions decide first, completion before failure. Without one
/// the phase of the most recently created pod is used. A job with neither is
/// inconsistent and reported as an error.
pub fn job_status(job: &Job, pods: &[&Pod]) -> EvalResult<JobStatusInfo> {
    if let Some(condition) = true_condition(
        job,
        &[JobConditionType::Complete, JobConditionType::SuccessCriteriaMet],
    ) {
        return Ok(from_condition(JobStatusType::Completed, condition));
    }

    if let Some(condition) = true_condition(
        job,
        &[JobConditionType::FailureTarget, JobConditionType::Failed],
    ) {
        return Ok(from_condition(JobStatusType::Failed, condition));
    }

    let pod = pods
        .iter()
        .max_by(|a, b| {
            a.metadata
                .creation_timestamp
                .total_cmp(&b.metadata.creation_timestamp)
        })
        .ok_or_else(|| EvalError::InconsistentJob {
            job: job.metadata.namespaced_name(),
        })?;

    let type_ = match pod.phase() {
        Phase::Running => JobStatusType::Running,
        Phase::Pending => JobStatusType::Pending,
        Phase::Succeeded => JobStatusType::Completed,
        Phase::Failed => JobStatusType::Failed,
        Phase::Unknown => JobStatusType::Unknown,
    };

    let message = pod_status_message_of(pod);
    let reason = (message != pod.phase().title()).then_some(message);

    Ok(JobStatusInfo {
        type_,
        reason,
        message: None,
    })
}
