use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::CheckError;
use crate::types::{Combinator, Measurement, Metric};

/// Accumulates measurements into one metric per label for a single run.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: BTreeMap<String, Metric>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, measurement: Measurement) -> Result<(), CheckError> {
        let existing = match self.metrics.entry(measurement.label.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(measurement.into());
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if !existing.combinator.same_kind(&measurement.combinator) {
            return Err(CheckError::CombinatorMismatch { label: measurement.label });
        }

        match (&mut existing.combinator, &measurement.combinator) {
            (Combinator::Sum, _) | (Combinator::PercentageOf { .. }, _) => {
                existing.value += measurement.value;
            }
            (Combinator::Max { key }, Combinator::Max { key: new_key }) => {
                if *new_key > *key || (*new_key == *key && measurement.value > existing.value) {
                    *key = *new_key;
                    existing.value = measurement.value;
                }
            }
            (Combinator::Min { key }, Combinator::Min { key: new_key }) => {
                if *new_key < *key || (*new_key == *key && measurement.value < existing.value) {
                    *key = *new_key;
                    existing.value = measurement.value;
                }
            }
            _ => unreachable!("combinator kinds checked above"),
        }
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = Measurement>>(&mut self, measurements: I) -> Result<(), CheckError> {
        for m in measurements {
            self.add(m)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Resolve percentage metrics against their reference and hand out the
    /// finished set, ordered by label.
    ///
    /// A percentage whose reference was never recorded is an error; one whose
    /// reference is zero has no meaningful value and is dropped.
    pub fn finalize(self) -> Result<Vec<Metric>, CheckError> {
        let mut finished = Vec::with_capacity(self.metrics.len());

        for metric in self.metrics.values() {
            let Combinator::PercentageOf { reference } = &metric.combinator else {
                finished.push(metric.clone());
                continue;
            };

            let total = self
                .metrics
                .get(reference)
                .ok_or_else(|| CheckError::MissingReference {
                    label: metric.label.clone(),
                    reference: reference.clone(),
                })?
                .value;

            if total == 0.0 {
                debug!("dropping {}: reference {} is zero", metric.label, reference);
                continue;
            }

            let mut resolved = metric.clone();
            resolved.value = percentage(metric.value, total);
            finished.push(resolved);
        }

        Ok(finished)
    }
}

/// Share of `part` in `total`, floored to one decimal place.
pub fn percentage(part: f64, total: f64) -> f64 {
    (1000.0 * part / total).floor() / 10.0
}
