use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::types::{Combinator, Measurement};

/// Where an object's metrics live in the label hierarchy.
pub struct ObjectScope {
    /// `project.<ns>.<kind>`, absent for cluster-scoped objects.
    pub namespaced: Option<String>,
    /// `global.<kind>`.
    pub global: String,
    /// Per-object prefix.
    pub object: String,
}

impl ObjectScope {
    pub fn new(kind: &str, meta: &ObjectMeta) -> Self {
        let namespaced = meta.namespace.as_ref().map(|ns| format!("project.{}.{}", ns, kind));
        let global = format!("global.{}", kind);
        let name = meta.name.as_deref().unwrap_or("");
        let object = match &namespaced {
            Some(ns) => format!("{}.{}", ns, name),
            None => format!("{}.{}", global, name),
        };
        Self { namespaced, global, object }
    }

    /// Prefixes that aggregate counts: namespace first, then global.
    pub fn aggregates(&self) -> impl Iterator<Item = &str> {
        self.namespaced.as_deref().into_iter().chain(std::iter::once(self.global.as_str()))
    }
}

/// Whole seconds from `earlier` to `later`, rounded towards negative infinity.
pub fn floor_seconds(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().div_euclid(1000)
}

/// `<prefix>.timestamp` plus `<prefix>.age` when `ts` is not in the future.
pub fn elapsed(prefix: &str, ts: DateTime<Utc>, now: DateTime<Utc>, combinator: &Combinator) -> Vec<Measurement> {
    let mut out = vec![Measurement::new(format!("{}.timestamp", prefix), ts.timestamp() as f64)
        .combined_by(combinator.clone())];
    if now >= ts {
        out.push(
            Measurement::new(format!("{}.age", prefix), floor_seconds(now, ts) as f64)
                .with_uom("s")
                .with_min(0.0)
                .combined_by(combinator.clone()),
        );
    }
    out
}

/// Count, deletion and (unless the caller branches it) creation measurements
/// every object shares.
pub fn common_measurements(scope: &ObjectScope, meta: &ObjectMeta, now: DateTime<Utc>, with_creation: bool) -> Vec<Measurement> {
    let mut out: Vec<Measurement> = scope
        .aggregates()
        .map(|prefix| Measurement::count(format!("{}.count", prefix)))
        .collect();

    if let Some(deleted) = meta.deletion_timestamp.as_ref() {
        out.extend(elapsed(&format!("{}.deletion", scope.object), deleted.0, now, &Combinator::Sum));
    }
    if with_creation {
        if let Some(created) = meta.creation_timestamp.as_ref() {
            out.extend(elapsed(&format!("{}.creation", scope.object), created.0, now, &Combinator::Sum));
        }
    }
    out
}

/// Lower-cased phase, `unknown` when absent.
pub fn phase_label(phase: Option<&String>) -> String {
    phase.map(|p| p.to_lowercase()).unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_scope_labels() {
        let meta = ObjectMeta {
            name: Some("web-1".to_string()),
            namespace: Some("shop".to_string()),
            ..Default::default()
        };
        let scope = ObjectScope::new("pod", &meta);
        assert_eq!(scope.namespaced.as_deref(), Some("project.shop.pod"));
        assert_eq!(scope.global, "global.pod");
        assert_eq!(scope.object, "project.shop.pod.web-1");
        assert_eq!(scope.aggregates().collect::<Vec<_>>(), vec!["project.shop.pod", "global.pod"]);

        let meta = ObjectMeta {
            name: Some("pv-1".to_string()),
            ..Default::default()
        };
        let scope = ObjectScope::new("persistentvolume", &meta);
        assert_eq!(scope.object, "global.persistentvolume.pv-1");
        assert_eq!(scope.aggregates().count(), 1);
    }

    #[test]
    fn test_floor_seconds() {
        let base = at(1000);
        assert_eq!(floor_seconds(base + Duration::milliseconds(5999), base), 5);
        assert_eq!(floor_seconds(base - Duration::milliseconds(1), base), -1);
    }

    #[test]
    fn test_elapsed_pair() {
        let out = elapsed("x.creation", at(1000), at(1120), &Combinator::Sum);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, "x.creation.timestamp");
        assert_eq!(out[0].value, 1000.0);
        assert_eq!(out[1].label, "x.creation.age");
        assert_eq!(out[1].value, 120.0);
        assert_eq!(out[1].uom.as_deref(), Some("s"));
    }

    #[test]
    fn test_elapsed_in_future_has_no_age() {
        let out = elapsed("x.deletion", at(2000), at(1000), &Combinator::Sum);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "x.deletion.timestamp");
    }

    #[test]
    fn test_common_measurements_with_deletion() {
        let meta = ObjectMeta {
            name: Some("a".to_string()),
            namespace: Some("ns".to_string()),
            creation_timestamp: Some(Time(at(100))),
            deletion_timestamp: Some(Time(at(200))),
            ..Default::default()
        };
        let scope = ObjectScope::new("job", &meta);
        let labels: Vec<String> = common_measurements(&scope, &meta, at(300), true)
            .into_iter()
            .map(|m| m.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "project.ns.job.count",
                "global.job.count",
                "project.ns.job.a.deletion.timestamp",
                "project.ns.job.a.deletion.age",
                "project.ns.job.a.creation.timestamp",
                "project.ns.job.a.creation.age",
            ]
        );
    }
}
