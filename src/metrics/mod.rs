// Per-kind measurement extractors
pub mod base;
pub mod jobs;
pub mod pods;
pub mod volumes;

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{PersistentVolume, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CheckError;
use crate::types::Measurement;

pub use jobs::{cronjob_measurements, job_measurements};
pub use pods::pod_measurements;
pub use volumes::{volume_measurements, VolumeGroup, VolumeInfo, VolumeSelector};

/// A snapshot object, decoded once according to its `kind`.
#[derive(Debug, Clone)]
pub enum Resource {
    Pod(Pod),
    Job(Job),
    CronJob(CronJob),
    PersistentVolume(PersistentVolume),
    Other { kind: String, metadata: ObjectMeta },
}

#[derive(Debug, Deserialize)]
struct SnapshotList {
    items: Vec<Value>,
}

impl Resource {
    pub fn from_value(mut value: Value) -> Result<Self, CheckError> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        // Older API groups carry the same fields; only the kind decides the shape.
        if let Some(obj) = value.as_object_mut() {
            obj.remove("apiVersion");
        }

        Ok(match kind.as_str() {
            "Pod" => Resource::Pod(decode(&kind, value)?),
            "Job" => Resource::Job(decode(&kind, value)?),
            "CronJob" => Resource::CronJob(decode(&kind, value)?),
            "PersistentVolume" => Resource::PersistentVolume(decode(&kind, value)?),
            _ => {
                let metadata = match value.get_mut("metadata") {
                    Some(meta) => decode(&kind, meta.take())?,
                    None => ObjectMeta::default(),
                };
                Resource::Other { kind, metadata }
            }
        })
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::Pod(o) => &o.metadata,
            Resource::Job(o) => &o.metadata,
            Resource::CronJob(o) => &o.metadata,
            Resource::PersistentVolume(o) => &o.metadata,
            Resource::Other { metadata, .. } => metadata,
        }
    }

    pub fn measurements(&self, now: DateTime<Utc>) -> Vec<Measurement> {
        match self {
            Resource::Pod(pod) => pod_measurements(pod, now),
            Resource::Job(job) => job_measurements(job, now),
            Resource::CronJob(cronjob) => cronjob_measurements(cronjob, now),
            Resource::PersistentVolume(pv) => volume_measurements(pv, now),
            Resource::Other { kind, metadata } => {
                let scope = base::ObjectScope::new(&kind.to_lowercase(), metadata);
                base::common_measurements(&scope, metadata, now, true)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, CheckError> {
    serde_json::from_value(value).map_err(|source| CheckError::Decode {
        kind: kind.to_string(),
        source,
    })
}

/// Decode a snapshot: a list object with `items`, or a bare array.
pub fn parse_snapshot(document: Value) -> Result<Vec<Resource>, CheckError> {
    let items = match document {
        Value::Array(items) => items,
        obj @ Value::Object(_) => {
            let list: SnapshotList = serde_json::from_value(obj).map_err(|_| CheckError::MalformedSnapshot)?;
            list.items
        }
        _ => return Err(CheckError::MalformedSnapshot),
    };
    items.into_iter().map(Resource::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_on_kind() {
        let snapshot = json!({
            "kind": "List",
            "items": [
                {"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "p", "namespace": "a"}},
                {"apiVersion": "batch/v1", "kind": "Job", "metadata": {"name": "j", "namespace": "a"}},
                {"apiVersion": "batch/v1beta1", "kind": "CronJob", "metadata": {"name": "c", "namespace": "a"}},
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "v"}},
                {"apiVersion": "v1", "kind": "Service", "metadata": {"name": "s", "namespace": "a"}}
            ]
        });

        let resources = parse_snapshot(snapshot).unwrap();
        assert_eq!(resources.len(), 5);
        assert!(matches!(resources[0], Resource::Pod(_)));
        assert!(matches!(resources[1], Resource::Job(_)));
        assert!(matches!(resources[2], Resource::CronJob(_)));
        assert!(matches!(resources[3], Resource::PersistentVolume(_)));
        assert!(matches!(&resources[4], Resource::Other { kind, .. } if kind == "Service"));
        assert_eq!(resources[4].metadata().name.as_deref(), Some("s"));
    }

    #[test]
    fn test_bare_array_snapshot() {
        let resources = parse_snapshot(json!([{"kind": "PersistentVolume", "metadata": {"name": "v"}}])).unwrap();
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(parse_snapshot(json!("nope")), Err(CheckError::MalformedSnapshot)));
        assert!(matches!(parse_snapshot(json!({"kind": "List"})), Err(CheckError::MalformedSnapshot)));
    }

    #[test]
    fn test_undecodable_object() {
        let err = parse_snapshot(json!([{"kind": "Pod", "metadata": {"name": 5}}])).unwrap_err();
        assert!(matches!(err, CheckError::Decode { ref kind, .. } if kind == "Pod"));
    }

    #[test]
    fn test_unrecognised_kind_only_counts() {
        let resource = Resource::from_value(json!({
            "kind": "ConfigMap",
            "metadata": {"name": "cfg", "namespace": "a"}
        }))
        .unwrap();
        let labels: Vec<String> = resource.measurements(Utc::now()).into_iter().map(|m| m.label).collect();
        assert_eq!(labels, vec!["project.a.configmap.count", "global.configmap.count"]);
    }
}
