use std::path::Path;

use anyhow::{Context, Result};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{PersistentVolume, Pod};
use kube::{api::ListParams, Api, Client};
use tracing::info;

use crate::error::CheckError;
use crate::metrics::{parse_snapshot, Resource};
use crate::types::{CheckMode, Config};

/// Objects handed to a check, either typed from the API server or a raw
/// JSON document that still has to be decoded.
#[derive(Debug)]
pub enum Snapshot {
    Cluster(Vec<Resource>),
    Document(serde_json::Value),
}

impl Snapshot {
    pub fn into_resources(self) -> Result<Vec<Resource>, CheckError> {
        match self {
            Snapshot::Cluster(resources) => Ok(resources),
            Snapshot::Document(document) => parse_snapshot(document),
        }
    }
}

/// Read a snapshot document from a JSON file. Objects inside it are decoded
/// later by the check.
pub fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let document = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Snapshot::Document(document))
}

/// Fetch the objects a check needs from the cluster.
pub async fn fetch_snapshot(client: &Client, cfg: &Config) -> Result<Snapshot> {
    let mut resources = Vec::new();

    if cfg.mode == CheckMode::ObjectStats {
        if cfg.namespaces.is_empty() {
            info!("listing workloads in all namespaces");
            list_workloads(client, None, &mut resources).await?;
        } else {
            for ns in &cfg.namespaces {
                info!("listing workloads in namespace {}", ns);
                list_workloads(client, Some(ns), &mut resources).await?;
            }
        }
    }

    let volumes: Api<PersistentVolume> = Api::all(client.clone());
    let items = volumes
        .list(&ListParams::default())
        .await
        .context("listing persistent volumes")?
        .items;
    resources.extend(items.into_iter().map(Resource::PersistentVolume));

    info!("fetched {} objects", resources.len());
    Ok(Snapshot::Cluster(resources))
}

async fn list_workloads(client: &Client, namespace: Option<&str>, out: &mut Vec<Resource>) -> Result<()> {
    let pods: Api<Pod> = scoped_api(client, namespace);
    let jobs: Api<Job> = scoped_api(client, namespace);
    let cronjobs: Api<CronJob> = scoped_api(client, namespace);
    let lp = ListParams::default();

    let pods = pods.list(&lp).await.context("listing pods")?.items;
    let jobs = jobs.list(&lp).await.context("listing jobs")?.items;
    let cronjobs = cronjobs.list(&lp).await.context("listing cron jobs")?.items;

    out.extend(pods.into_iter().map(Resource::Pod));
    out.extend(jobs.into_iter().map(Resource::Job));
    out.extend(cronjobs.into_iter().map(Resource::CronJob));
    Ok(())
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"kind": "List", "items": [{{"kind": "Pod", "metadata": {{"name": "p", "namespace": "a"}}}}]}}"#
        )
        .unwrap();

        let resources = load_snapshot_file(file.path()).unwrap().into_resources().unwrap();
        assert_eq!(resources.len(), 1);
        assert!(matches!(resources[0], Resource::Pod(_)));
    }

    #[test]
    fn test_load_snapshot_file_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_snapshot_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));

        let err = load_snapshot_file(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("reading"));
    }

    #[test]
    fn test_undecodable_object_fails_at_decode_not_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"kind": "Pod", "metadata": {{"name": 5}}}}]"#).unwrap();

        let snapshot = load_snapshot_file(file.path()).unwrap();
        let err = snapshot.into_resources().unwrap_err();
        assert!(matches!(err, CheckError::Decode { ref kind, .. } if kind == "Pod"));
    }
}
