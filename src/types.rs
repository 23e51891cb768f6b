use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use crate::limits::LimitTable;

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: CheckMode,
    pub namespaces: Vec<String>,
    pub snapshot_file: Option<PathBuf>,
    pub verbose: bool,
    pub limits: LimitTable,
    pub selectors: Vec<SelectorRule>,
    pub default_warn: Option<f64>,
    pub default_crit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    ObjectStats,
    PvAvail,
}

/// Outcome of a check, totally ordered by urgency:
/// critical > warning > unknown > ok.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    fn urgency(self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Unknown => 1,
            Severity::Warning => 2,
            Severity::Critical => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    /// Most urgent severity in `iter`; `Ok` when empty.
    pub fn worst<I: IntoIterator<Item = Severity>>(iter: I) -> Severity {
        iter.into_iter().max().unwrap_or_default()
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.urgency().cmp(&other.urgency())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How measurements sharing a label are merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Combinator {
    #[default]
    Sum,
    /// Keep the value paired with the smallest key.
    Min { key: i64 },
    /// Keep the value paired with the largest key.
    Max { key: i64 },
    /// Count of own measurements, expressed as a share of `reference` at finalize.
    PercentageOf { reference: String },
}

impl Combinator {
    pub(crate) fn same_kind(&self, other: &Combinator) -> bool {
        match (self, other) {
            (Combinator::Sum, Combinator::Sum) => true,
            (Combinator::Min { .. }, Combinator::Min { .. }) => true,
            (Combinator::Max { .. }, Combinator::Max { .. }) => true,
            (Combinator::PercentageOf { reference: a }, Combinator::PercentageOf { reference: b }) => a == b,
            _ => false,
        }
    }
}

/// A single raw data point emitted by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub label: String,
    pub value: f64,
    pub uom: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub combinator: Combinator,
}

impl Measurement {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            uom: None,
            min: None,
            max: None,
            combinator: Combinator::Sum,
        }
    }

    /// Count measurement: value 1, lower bound 0, summed.
    pub fn count(label: impl Into<String>) -> Self {
        Self::new(label, 1.0).with_min(0.0)
    }

    pub fn with_uom(mut self, uom: &str) -> Self {
        self.uom = Some(uom.to_string());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn combined_by(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }
}

/// Combined value for one label.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: f64,
    pub uom: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub combinator: Combinator,
}

impl From<Measurement> for Metric {
    fn from(m: Measurement) -> Self {
        Self {
            label: m.label,
            value: m.value,
            uom: m.uom,
            min: m.min,
            max: m.max,
            combinator: m.combinator,
        }
    }
}

/// Ordered volume selector. `storage_class == "*"` matches any class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectorRule {
    pub storage_class: String,
    pub label: Option<(String, String)>,
    pub capacity: Option<String>,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
}

impl SelectorRule {
    pub fn any_class() -> Self {
        Self {
            storage_class: "*".to_string(),
            ..Default::default()
        }
    }
}

/// One line of the report, built by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub name: String,
    pub value: f64,
    pub uom: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub status: Severity,
    pub message: Option<String>,
    pub visible: bool,
}

/// Final check result: severity plus the single output line.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutput {
    pub severity: Severity,
    pub text: String,
}

impl CheckOutput {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self { severity, text: text.into() }
    }

    /// Output for failures that stop a run before or outside the engine.
    pub fn failure(severity: Severity, diagnostic: impl fmt::Display) -> Self {
        Self::new(severity, format!("{}: {}", severity.label(), diagnostic))
    }
}

impl fmt::Display for CheckOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
