use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::collector::MetricsCollector;
use crate::error::CheckError;
use crate::kubernetes::Snapshot;
use crate::limits::LimitTable;
use crate::metrics::{Resource, VolumeInfo, VolumeSelector};
use crate::report::{metric_entry, volume_entry, CheckReport, Visibility};
use crate::types::{CheckMode, CheckOutput, Config, SelectorRule, Severity};

/// Outcome when the configuration could not be loaded.
pub fn config_failure(err: &anyhow::Error) -> CheckOutput {
    error!("configuration error: {:#}", err);
    CheckOutput::failure(Severity::Unknown, format!("{:#}", err))
}

/// Run the configured check over a fetched snapshot.
///
/// A snapshot that could not be fetched is CRITICAL. Objects that do not
/// decode and inconsistent metrics are UNKNOWN.
pub fn execute(cfg: &Config, snapshot: anyhow::Result<Snapshot>, now: DateTime<Utc>) -> CheckOutput {
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("fetching snapshot failed: {:#}", e);
            return CheckOutput::failure(Severity::Critical, format!("{:#}", e));
        }
    };

    let outcome = snapshot.into_resources().and_then(|resources| match cfg.mode {
        CheckMode::ObjectStats => ObjectStatsCheck::from_config(cfg).run(&resources, now),
        CheckMode::PvAvail => Ok(VolumeAvailabilityCheck::from_config(cfg).run(&resources)),
    });

    outcome.unwrap_or_else(|e| {
        let e = anyhow::Error::from(e);
        error!("check failed: {:#}", e);
        CheckOutput::failure(Severity::Unknown, format!("{:#}", e))
    })
}

/// Counts, ages and durations over every object in the snapshot.
pub struct ObjectStatsCheck<'a> {
    limits: &'a LimitTable,
    verbose: bool,
}

impl<'a> ObjectStatsCheck<'a> {
    pub fn new(limits: &'a LimitTable, verbose: bool) -> Self {
        Self { limits, verbose }
    }

    pub fn from_config(cfg: &'a Config) -> Self {
        Self::new(&cfg.limits, cfg.verbose)
    }

    pub fn evaluate(&self, resources: &[Resource], now: DateTime<Utc>) -> Result<CheckReport, CheckError> {
        let mut collector = MetricsCollector::new();
        for resource in resources {
            collector.extend(resource.measurements(now))?;
        }
        debug!("collected {} metrics from {} objects", collector.len(), resources.len());

        let mut entries: Vec<_> = collector
            .finalize()?
            .into_iter()
            .map(|m| metric_entry(m, self.limits))
            .collect();
        Visibility::new(self.verbose, self.limits).apply(&mut entries);

        Ok(CheckReport::new(entries, self.verbose))
    }

    pub fn run(&self, resources: &[Resource], now: DateTime<Utc>) -> Result<CheckOutput, CheckError> {
        let report = self.evaluate(resources, now)?;
        let summary = report.summary();
        info!(
            "object stats: {} metrics, {} selected, {} filtered",
            summary.total,
            summary.selected,
            summary.filtered()
        );
        Ok(report.render())
    }
}

/// Free statically provisioned volumes per selector rule.
pub struct VolumeAvailabilityCheck<'a> {
    selector: VolumeSelector<'a>,
    verbose: bool,
}

impl<'a> VolumeAvailabilityCheck<'a> {
    pub fn new(rules: &'a [SelectorRule], default_warn: Option<f64>, default_crit: Option<f64>, verbose: bool) -> Self {
        Self {
            selector: VolumeSelector::new(rules, default_warn, default_crit),
            verbose,
        }
    }

    pub fn from_config(cfg: &'a Config) -> Self {
        Self::new(&cfg.selectors, cfg.default_warn, cfg.default_crit, cfg.verbose)
    }

    pub fn evaluate(&self, resources: &[Resource]) -> CheckReport {
        let volumes: Vec<VolumeInfo> = resources
            .iter()
            .filter_map(|r| match r {
                Resource::PersistentVolume(pv) => Some(VolumeInfo::from(pv)),
                _ => None,
            })
            .collect();

        let entries = self.selector.group(&volumes).iter().map(volume_entry).collect();
        CheckReport::new(entries, self.verbose)
    }

    pub fn run(&self, resources: &[Resource]) -> CheckOutput {
        let report = self.evaluate(resources);
        info!("volume availability: {} groups", report.entries().len());
        report.render()
    }
}
