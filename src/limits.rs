use std::collections::{HashMap, HashSet, VecDeque};

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Warn,
    Crit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ExactLimits {
    warn: Option<f64>,
    crit: Option<f64>,
}

/// Warn/crit thresholds keyed by exact metric name or by regex.
///
/// Regex entries are kept most-recently-declared first; lookups return the
/// first match, so a later declaration overrides an earlier, broader one.
#[derive(Debug, Clone, Default)]
pub struct LimitTable {
    exact: HashMap<String, ExactLimits>,
    regex_warn: VecDeque<(Regex, f64)>,
    regex_crit: VecDeque<(Regex, f64)>,
    always_show: HashSet<String>,
    always_show_regex: Vec<Regex>,
}

impl LimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_exact(&mut self, name: impl Into<String>, kind: LimitKind, value: f64) {
        let entry = self.exact.entry(name.into()).or_default();
        match kind {
            LimitKind::Warn => entry.warn = Some(value),
            LimitKind::Crit => entry.crit = Some(value),
        }
    }

    pub fn prepend_regex(&mut self, pattern: &str, kind: LimitKind, value: f64) -> Result<(), regex::Error> {
        let re = Regex::new(pattern)?;
        match kind {
            LimitKind::Warn => self.regex_warn.push_front((re, value)),
            LimitKind::Crit => self.regex_crit.push_front((re, value)),
        }
        Ok(())
    }

    pub fn always_show(&mut self, name: impl Into<String>) {
        self.always_show.insert(name.into());
    }

    pub fn always_show_regex(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.always_show_regex.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Exact name first, then the first matching regex, else nothing.
    pub fn resolve(&self, name: &str, kind: LimitKind) -> Option<f64> {
        let exact = self.exact.get(name).and_then(|l| match kind {
            LimitKind::Warn => l.warn,
            LimitKind::Crit => l.crit,
        });
        if exact.is_some() {
            return exact;
        }

        let rules = match kind {
            LimitKind::Warn => &self.regex_warn,
            LimitKind::Crit => &self.regex_crit,
        };
        rules
            .iter()
            .find(|(re, _)| re.is_match(name))
            .map(|(_, value)| *value)
    }

    pub fn is_always_shown(&self, name: &str) -> bool {
        self.always_show.contains(name) || self.always_show_regex.iter().any(|re| re.is_match(name))
    }
}
