pub mod perfdata;

use std::cmp::Reverse;

use crate::limits::{LimitKind, LimitTable};
use crate::metrics::VolumeGroup;
use crate::report::perfdata::{format_number, perfdata_token};
use crate::types::{CheckOutput, Metric, ReportEntry, Severity};

/// Too much: `value` above a threshold.
pub fn classify(value: f64, warn: Option<f64>, crit: Option<f64>) -> Severity {
    if crit.is_some_and(|c| value > c) {
        Severity::Critical
    } else if warn.is_some_and(|w| value > w) {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Too little: `available` below a threshold.
pub fn classify_headroom(available: f64, warn: Option<f64>, crit: Option<f64>) -> Severity {
    if crit.is_some_and(|c| available < c) {
        Severity::Critical
    } else if warn.is_some_and(|w| available < w) {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Report entry for a finished metric, thresholds resolved from `limits`.
pub fn metric_entry(metric: Metric, limits: &LimitTable) -> ReportEntry {
    let warn = limits.resolve(&metric.label, LimitKind::Warn);
    let crit = limits.resolve(&metric.label, LimitKind::Crit);
    let status = classify(metric.value, warn, crit);

    let threshold = match status {
        Severity::Critical => crit,
        Severity::Warning => warn,
        _ => None,
    };
    let message = threshold.map(|t| {
        format!(
            "{} is {}{} ({} above {})",
            metric.label,
            format_number(metric.value),
            metric.uom.as_deref().unwrap_or(""),
            status.label().to_lowercase(),
            format_number(t)
        )
    });

    ReportEntry {
        name: metric.label,
        value: metric.value,
        uom: metric.uom,
        min: metric.min,
        max: metric.max,
        warn,
        crit,
        status,
        message,
        visible: false,
    }
}

/// Report entry for a volume group. Thresholds are given as free volumes and
/// re-expressed against the used count for perfdata.
pub fn volume_entry(group: &VolumeGroup) -> ReportEntry {
    let total = group.total as f64;
    let status = classify_headroom(group.available as f64, group.warn, group.crit);

    let message = (status != Severity::Ok).then(|| {
        let mut msg = format!(
            "{} of {} volumes with {} available",
            group.available, group.total, group.capacity
        );
        if !group.storage_class.is_empty() {
            msg.push_str(&format!(" in storage class {}", group.storage_class));
        }
        msg
    });

    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    ReportEntry {
        name: format!("pv.{}.{}.used", or_dash(&group.storage_class), or_dash(&group.capacity)),
        value: group.used() as f64,
        uom: None,
        min: Some(0.0),
        max: Some(total),
        warn: group.warn.map(|w| (total - w).max(0.0)),
        crit: group.crit.map(|c| (total - c).max(0.0)),
        status,
        message,
        visible: true,
    }
}

/// Decides which entries make it into the perfdata.
pub struct Visibility<'a> {
    verbose: bool,
    limits: &'a LimitTable,
}

impl<'a> Visibility<'a> {
    pub fn new(verbose: bool, limits: &'a LimitTable) -> Self {
        Self { verbose, limits }
    }

    pub fn is_visible(&self, entry: &ReportEntry) -> bool {
        self.verbose
            || entry.status != Severity::Ok
            || entry.message.is_some()
            || self.limits.is_always_shown(&entry.name)
    }

    pub fn apply(&self, entries: &mut [ReportEntry]) {
        for entry in entries.iter_mut() {
            entry.visible = self.is_visible(entry);
        }
    }
}

/// Bookkeeping about how many entries were shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub selected: usize,
}

impl ReportSummary {
    pub fn filtered(&self) -> usize {
        self.total - self.selected
    }
}

/// Classified entries on their way to the output line.
pub struct CheckReport {
    entries: Vec<ReportEntry>,
    verbose: bool,
}

impl CheckReport {
    pub fn new(entries: Vec<ReportEntry>, verbose: bool) -> Self {
        Self { entries, verbose }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn severity(&self) -> Severity {
        Severity::worst(self.entries.iter().map(|e| e.status))
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.entries.len(),
            selected: self.entries.iter().filter(|e| e.visible).count(),
        }
    }

    /// Visible entries, worst first, then by name.
    pub fn selected(&self) -> Vec<&ReportEntry> {
        let mut visible: Vec<&ReportEntry> = self.entries.iter().filter(|e| e.visible).collect();
        visible.sort_by(|a, b| (Reverse(a.status), &a.name).cmp(&(Reverse(b.status), &b.name)));
        visible
    }

    pub fn render(&self) -> CheckOutput {
        let severity = self.severity();
        let selected = self.selected();
        let summary = self.summary();

        let messages: Vec<&str> = selected.iter().filter_map(|e| e.message.as_deref()).collect();
        let headline = if messages.is_empty() {
            severity.label().to_string()
        } else {
            format!("{}: {}", severity.label(), messages.join(", "))
        };

        let mut tokens: Vec<String> = selected
            .iter()
            .map(|e| perfdata_token(&e.name, e.value, e.uom.as_deref(), e.warn, e.crit, e.min, e.max))
            .collect();
        for (label, count) in [
            ("metrics.total", summary.total),
            ("metrics.selected", summary.selected),
            ("metrics.filtered", summary.filtered()),
        ] {
            tokens.push(perfdata_token(label, count as f64, None, None, None, Some(0.0), None));
        }

        let separator = if self.verbose { "\n" } else { " " };
        CheckOutput::new(severity, format!("{} | {}", headline, tokens.join(separator)))
    }
}
