use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::PersistentVolume;
use tracing::debug;

use crate::metrics::base::{common_measurements, phase_label, ObjectScope};
use crate::types::{Measurement, SelectorRule};

const PROVISIONED_BY: &str = "pv.kubernetes.io/provisioned-by";

/// Measurements for one persistent volume in the object-stats check.
pub fn volume_measurements(pv: &PersistentVolume, now: DateTime<Utc>) -> Vec<Measurement> {
    let scope = ObjectScope::new("persistentvolume", &pv.metadata);
    let mut out = common_measurements(&scope, &pv.metadata, now, true);
    let phase = phase_label(pv.status.as_ref().and_then(|s| s.phase.as_ref()));
    out.push(Measurement::count(format!("{}.{}.count", scope.global, phase)));
    out
}

/// Fields of a persistent volume the selector rules look at.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInfo {
    pub name: String,
    pub storage_class: String,
    pub labels: BTreeMap<String, String>,
    pub capacity: String,
    pub available: bool,
    pub externally_provisioned: bool,
}

impl From<&PersistentVolume> for VolumeInfo {
    fn from(pv: &PersistentVolume) -> Self {
        let spec = pv.spec.as_ref();
        Self {
            name: pv.metadata.name.clone().unwrap_or_default(),
            storage_class: spec.and_then(|s| s.storage_class_name.clone()).unwrap_or_default(),
            labels: pv.metadata.labels.clone().unwrap_or_default(),
            capacity: spec
                .and_then(|s| s.capacity.as_ref())
                .and_then(|c| c.get("storage"))
                .map(|q| q.0.clone())
                .unwrap_or_default(),
            available: pv.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Available"),
            externally_provisioned: pv
                .metadata
                .annotations
                .as_ref()
                .is_some_and(|a| a.contains_key(PROVISIONED_BY)),
        }
    }
}

impl SelectorRule {
    /// Capacity is compared as written, so `10Gi` and `10240Mi` differ.
    pub fn matches(&self, volume: &VolumeInfo) -> bool {
        if self.storage_class != "*" && self.storage_class != volume.storage_class {
            return false;
        }
        if let Some((key, value)) = &self.label {
            if volume.labels.get(key) != Some(value) {
                return false;
            }
        }
        if let Some(capacity) = &self.capacity {
            if *capacity != volume.capacity {
                return false;
            }
        }
        true
    }
}

/// Volumes sharing a storage class and capacity, claimed by one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGroup {
    pub storage_class: String,
    pub capacity: String,
    pub total: usize,
    pub available: usize,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
}

impl VolumeGroup {
    pub fn used(&self) -> usize {
        self.total - self.available
    }
}

/// Walks the rules in order, each claiming the volumes it matches so later
/// rules only see the remainder. A catch-all rule with the default
/// thresholds runs last.
pub struct VolumeSelector<'a> {
    rules: &'a [SelectorRule],
    default_warn: Option<f64>,
    default_crit: Option<f64>,
}

impl<'a> VolumeSelector<'a> {
    pub fn new(rules: &'a [SelectorRule], default_warn: Option<f64>, default_crit: Option<f64>) -> Self {
        Self {
            rules,
            default_warn,
            default_crit,
        }
    }

    pub fn group(&self, volumes: &[VolumeInfo]) -> Vec<VolumeGroup> {
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();

        let fallback = SelectorRule {
            warn: self.default_warn,
            crit: self.default_crit,
            ..SelectorRule::any_class()
        };

        for rule in self.rules.iter().chain(std::iter::once(&fallback)) {
            let matched: Vec<&VolumeInfo> = volumes
                .iter()
                .filter(|v| !v.externally_provisioned && !claimed.contains(v.name.as_str()) && rule.matches(v))
                .collect();
            debug!("selector {:?} matched {} volumes", rule, matched.len());

            let mut by_key: BTreeMap<(&str, &str), (usize, usize)> = BTreeMap::new();
            for v in &matched {
                claimed.insert(v.name.as_str());
                let entry = by_key.entry((v.storage_class.as_str(), v.capacity.as_str())).or_default();
                entry.0 += 1;
                if v.available {
                    entry.1 += 1;
                }
            }

            for ((storage_class, capacity), (total, available)) in by_key {
                groups.push(VolumeGroup {
                    storage_class: storage_class.to_string(),
                    capacity: capacity.to_string(),
                    total,
                    available,
                    warn: rule.warn.or(self.default_warn),
                    crit: rule.crit.or(self.default_crit),
                });
            }
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PersistentVolumeSpec, PersistentVolumeStatus};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn volume(name: &str, class: &str, capacity: &str, available: bool) -> VolumeInfo {
        VolumeInfo {
            name: name.to_string(),
            storage_class: class.to_string(),
            labels: BTreeMap::new(),
            capacity: capacity.to_string(),
            available,
            externally_provisioned: false,
        }
    }

    #[test]
    fn test_volume_info_from_pv() {
        let pv = PersistentVolume {
            metadata: ObjectMeta {
                name: Some("pv-7".to_string()),
                labels: Some(BTreeMap::from([("tier".to_string(), "fast".to_string())])),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec {
                storage_class_name: Some("gold".to_string()),
                capacity: Some(BTreeMap::from([("storage".to_string(), Quantity("5Gi".to_string()))])),
                ..Default::default()
            }),
            status: Some(PersistentVolumeStatus {
                phase: Some("Available".to_string()),
                ..Default::default()
            }),
        };

        let info = VolumeInfo::from(&pv);
        assert_eq!(info.name, "pv-7");
        assert_eq!(info.storage_class, "gold");
        assert_eq!(info.capacity, "5Gi");
        assert_eq!(info.labels.get("tier").map(String::as_str), Some("fast"));
        assert!(info.available);
        assert!(!info.externally_provisioned);
    }

    #[test]
    fn test_provisioned_volume_detected() {
        let pv = PersistentVolume {
            metadata: ObjectMeta {
                name: Some("pvc-abc".to_string()),
                annotations: Some(BTreeMap::from([(PROVISIONED_BY.to_string(), "ebs.csi.aws.com".to_string())])),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(VolumeInfo::from(&pv).externally_provisioned);
    }

    #[test]
    fn test_rule_matching() {
        let mut v = volume("a", "gold", "1Gi", true);
        v.labels.insert("tier".to_string(), "fast".to_string());

        assert!(SelectorRule::any_class().matches(&v));
        let by_class = SelectorRule {
            storage_class: "silver".to_string(),
            ..Default::default()
        };
        assert!(!by_class.matches(&v));

        let by_label = SelectorRule {
            label: Some(("tier".to_string(), "fast".to_string())),
            ..SelectorRule::any_class()
        };
        assert!(by_label.matches(&v));
        let wrong_label = SelectorRule {
            label: Some(("tier".to_string(), "slow".to_string())),
            ..SelectorRule::any_class()
        };
        assert!(!wrong_label.matches(&v));
    }

    #[test]
    fn test_capacity_is_compared_literally() {
        // 10Gi and 10240Mi are the same size but do not match each other.
        let v = volume("a", "", "10Gi", true);
        let rule = SelectorRule {
            capacity: Some("10240Mi".to_string()),
            ..SelectorRule::any_class()
        };
        assert!(!rule.matches(&v));
    }

    #[test]
    fn test_rules_claim_volumes_exclusively() {
        let volumes = vec![
            volume("a", "gold", "1Gi", true),
            volume("b", "gold", "1Gi", false),
            volume("c", "gold", "5Gi", true),
            volume("d", "", "1Gi", false),
        ];
        let rules = vec![
            SelectorRule {
                storage_class: "gold".to_string(),
                capacity: Some("1Gi".to_string()),
                crit: Some(1.0),
                ..Default::default()
            },
            SelectorRule {
                storage_class: "gold".to_string(),
                ..Default::default()
            },
        ];

        let groups = VolumeSelector::new(&rules, Some(3.0), Some(2.0)).group(&volumes);
        assert_eq!(groups.len(), 3);

        assert_eq!((groups[0].storage_class.as_str(), groups[0].capacity.as_str()), ("gold", "1Gi"));
        assert_eq!((groups[0].total, groups[0].available), (2, 1));
        assert_eq!((groups[0].warn, groups[0].crit), (Some(3.0), Some(1.0)));

        assert_eq!((groups[1].capacity.as_str(), groups[1].total), ("5Gi", 1));
        assert_eq!((groups[1].warn, groups[1].crit), (Some(3.0), Some(2.0)));

        assert_eq!((groups[2].storage_class.as_str(), groups[2].capacity.as_str()), ("", "1Gi"));
        assert_eq!(groups[2].used(), 1);

        let counted: usize = groups.iter().map(|g| g.total).sum();
        assert_eq!(counted, volumes.len());
    }

    #[test]
    fn test_provisioned_volumes_are_skipped() {
        let mut dynamic = volume("pvc-1", "gold", "1Gi", true);
        dynamic.externally_provisioned = true;
        let volumes = vec![dynamic, volume("a", "gold", "1Gi", true)];

        let groups = VolumeSelector::new(&[], None, None).group(&volumes);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total, 1);
    }

    #[test]
    fn test_no_volumes_no_groups() {
        assert!(VolumeSelector::new(&[], Some(1.0), Some(1.0)).group(&[]).is_empty());
    }
}
