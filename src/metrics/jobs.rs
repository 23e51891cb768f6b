use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::{CronJob, Job, JobStatus};

use crate::metrics::base::{common_measurements, elapsed, floor_seconds, ObjectScope};
use crate::types::{Combinator, Measurement};

/// Measurements for one cron job.
pub fn cronjob_measurements(cronjob: &CronJob, now: DateTime<Utc>) -> Vec<Measurement> {
    let meta = &cronjob.metadata;
    let scope = ObjectScope::new("cronjob", meta);
    let mut out = common_measurements(&scope, meta, now, true);

    let suspended = cronjob.spec.as_ref().and_then(|s| s.suspend).unwrap_or(false);
    out.push(
        Measurement::new(format!("{}.suspend", scope.object), if suspended { 1.0 } else { 0.0 })
            .with_min(0.0)
            .with_max(1.0),
    );

    if let Some(ts) = cronjob.status.as_ref().and_then(|s| s.last_schedule_time.as_ref()) {
        out.extend(elapsed(&format!("{}.lastschedule", scope.object), ts.0, now, &Combinator::Sum));
    }

    // Present even before the first successful run; any real completion outranks it.
    out.push(
        Measurement::new(format!("{}.lastsuccess.completion.timestamp", scope.object), 0.0)
            .combined_by(Combinator::Max { key: 0 }),
    );

    out
}

/// Measurements for one job, mirrored under its owning cron job when the
/// run succeeded.
pub fn job_measurements(job: &Job, now: DateTime<Utc>) -> Vec<Measurement> {
    let meta = &job.metadata;
    let scope = ObjectScope::new("job", meta);
    let mut out = common_measurements(&scope, meta, now, true);

    let Some(status) = job.status.as_ref() else {
        return out;
    };

    out.extend(status_measurements(&scope.object, status, now, &Combinator::Sum));

    if let (Some(owner), Some(completed)) = (owning_cronjob(job), successful_completion(status)) {
        let prefix = format!(
            "project.{}.cronjob.{}.lastsuccess",
            meta.namespace.as_deref().unwrap_or(""),
            owner
        );
        let latest = Combinator::Max {
            key: completed.timestamp(),
        };
        out.extend(status_measurements(&prefix, status, now, &latest));
    }

    out
}

fn status_measurements(prefix: &str, status: &JobStatus, now: DateTime<Utc>, combinator: &Combinator) -> Vec<Measurement> {
    let mut out = Vec::new();

    let pods = [
        ("active", status.active),
        ("failed", status.failed),
        ("succeeded", status.succeeded),
    ];
    for (name, count) in pods {
        if let Some(count) = count {
            out.push(
                Measurement::new(format!("{}.{}", prefix, name), count as f64)
                    .with_min(0.0)
                    .combined_by(combinator.clone()),
            );
        }
    }

    let started = status.start_time.as_ref().map(|t| t.0);
    let completed = status.completion_time.as_ref().map(|t| t.0);
    if let Some(ts) = started {
        out.extend(elapsed(&format!("{}.start", prefix), ts, now, combinator));
    }
    if let Some(ts) = completed {
        out.extend(elapsed(&format!("{}.completion", prefix), ts, now, combinator));
    }
    if let (Some(start), Some(end)) = (started, completed) {
        out.push(
            Measurement::new(format!("{}.duration", prefix), floor_seconds(end, start) as f64)
                .with_uom("s")
                .with_min(0.0)
                .combined_by(combinator.clone()),
        );
    }

    out
}

/// Completion time of a job that finished with no active and some succeeded pods.
fn successful_completion(status: &JobStatus) -> Option<DateTime<Utc>> {
    let completed = status.completion_time.as_ref()?.0;
    let done = status.active.unwrap_or(0) == 0 && status.succeeded.unwrap_or(0) > 0;
    done.then_some(completed)
}

fn owning_cronjob(job: &Job) -> Option<&str> {
    job.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.kind == "CronJob" && r.controller == Some(true))
        .map(|r| r.name.as_str())
}
