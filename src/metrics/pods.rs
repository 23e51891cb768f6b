use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Pod, PodCondition};

use crate::metrics::base::{common_measurements, elapsed, floor_seconds, phase_label, ObjectScope};
use crate::types::{Combinator, Measurement};

/// Measurements for one pod.
pub fn pod_measurements(pod: &Pod, now: DateTime<Utc>) -> Vec<Measurement> {
    let meta = &pod.metadata;
    let scope = ObjectScope::new("pod", meta);
    let mut out = common_measurements(&scope, meta, now, false);

    let phase = phase_label(pod.status.as_ref().and_then(|s| s.phase.as_ref()));
    for prefix in scope.aggregates() {
        out.push(Measurement::count(format!("{}.{}.count", prefix, phase)));
        out.push(
            Measurement::new(format!("{}.{}.percent", prefix, phase), 1.0)
                .with_uom("%")
                .with_min(0.0)
                .with_max(100.0)
                .combined_by(Combinator::PercentageOf {
                    reference: format!("{}.count", prefix),
                }),
        );
    }

    if let Some(created) = meta.creation_timestamp.as_ref() {
        let branch = if phase == "pending" && scheduled_condition(pod).is_none() {
            "unscheduled"
        } else {
            phase.as_str()
        };
        out.extend(elapsed(
            &format!("{}.creation.{}", scope.object, branch),
            created.0,
            now,
            &Combinator::Sum,
        ));
    }

    if let Some(secs) = running_after(pod) {
        out.push(
            Measurement::new(format!("{}.running_after", scope.object), secs as f64)
                .with_uom("s")
                .with_min(0.0),
        );
    }

    out
}

fn scheduled_condition(pod: &Pod) -> Option<&PodCondition> {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|c| c.type_ == "PodScheduled" && c.status == "True")
        })
}

/// Seconds from scheduling until the last container was running.
///
/// Only known while no container has restarted; a restart replaces the
/// original start time.
fn running_after(pod: &Pod) -> Option<i64> {
    let scheduled_at = scheduled_condition(pod)?.last_transition_time.as_ref()?.0;
    let statuses = pod.status.as_ref()?.container_statuses.as_ref()?;

    let mut latest: Option<DateTime<Utc>> = None;
    for cs in statuses {
        if cs.restart_count > 0 {
            return None;
        }
        let started = cs.state.as_ref()?.running.as_ref()?.started_at.as_ref()?.0;
        latest = Some(latest.map_or(started, |l| l.max(started)));
    }

    Some(floor_seconds(latest?, scheduled_at))
}
