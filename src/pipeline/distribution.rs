// Label distribution: label -> count over a classification run.
//
// `unclassified` is tracked separately from assigned labels so an oracle
// that literally answers "unclassified" can't be confused with a failure.

use std::collections::BTreeMap;

use serde::Serialize;

use super::classify::{ClassificationOutcome, Label};
use crate::analysis::overlap::percent;

/// Row name used for records without a label.
pub const UNCLASSIFIED: &str = "unclassified";

#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelDistribution {
    counts: BTreeMap<String, usize>,
    unclassified: usize,
    total: usize,
}

/// One line of the distribution table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub label: String,
    pub count: usize,
    pub percent: f64,
    /// True for the `unclassified` row.
    pub unclassified: bool,
}

impl LabelDistribution {
    pub fn from_outcomes(outcomes: &[ClassificationOutcome]) -> Self {
        let mut dist = LabelDistribution::default();
        for outcome in outcomes {
            dist.add(&outcome.label);
        }
        dist
    }

    pub fn add(&mut self, label: &Label) {
        match label {
            Label::Assigned(name) => *self.counts.entry(name.clone()).or_insert(0) += 1,
            Label::Unclassified => self.unclassified += 1,
        }
        self.total += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn unclassified(&self) -> usize {
        self.unclassified
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Distinct assigned labels.
    pub fn label_count(&self) -> usize {
        self.counts.len()
    }

    /// Assigned labels by count descending (ties alphabetical), then an
    /// explicit `unclassified` row when any record lacks a label.
    pub fn rows(&self) -> Vec<DistributionRow> {
        let mut rows: Vec<DistributionRow> = self
            .counts
            .iter()
            .map(|(label, &count)| DistributionRow {
                label: label.clone(),
                count,
                percent: percent(count, self.total),
                unclassified: false,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

        if self.unclassified > 0 {
            rows.push(DistributionRow {
                label: UNCLASSIFIED.to_string(),
                count: self.unclassified,
                percent: percent(self.unclassified, self.total),
                unclassified: true,
            });
        }
        rows
    }
}
