//! Aggregate pull request metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::github::PullRequest;
use jira_sync::KeyExtractor;

/// Aggregate metrics over a batch of pull requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_prs: usize,
    pub merged_prs: usize,
    pub open_prs: usize,
    pub closed_without_merge: usize,
    pub with_jira_key: usize,
    pub without_jira_key: usize,
    /// Mean creation-to-merge latency over merged PRs, 2 dp
    pub avg_time_to_merge_hours: f64,
    /// Percentage of PRs referencing an issue key, 2 dp
    pub jira_compliance_rate: f64,
    /// Issue-key project prefix to PR count
    pub prs_by_project: BTreeMap<String, usize>,
    /// `YYYY-MM` of creation to PR count
    pub monthly_trend: BTreeMap<String, usize>,
}

/// Running totals. Accumulators over disjoint batches can be merged in any
/// order and produce the same summary.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    total: usize,
    merged: usize,
    open: usize,
    closed_without_merge: usize,
    with_key: usize,
    merge_hours_sum: f64,
    by_project: BTreeMap<String, usize>,
    by_month: BTreeMap<String, usize>,
}

impl MetricsAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pr: &PullRequest, extractor: &KeyExtractor) {
        self.total += 1;

        if let Some(key) = extractor.first_key(&pr.key_sources()) {
            self.with_key += 1;
            *self.by_project.entry(key.project().to_string()).or_default() += 1;
        }

        if pr.is_open() {
            self.open += 1;
        } else if let Some(hours) = pr.hours_to_merge() {
            self.merged += 1;
            self.merge_hours_sum += hours;
        } else {
            self.closed_without_merge += 1;
        }

        let month = pr.created_at.format("%Y-%m").to_string();
        *self.by_month.entry(month).or_default() += 1;
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: Self) {
        self.total += other.total;
        self.merged += other.merged;
        self.open += other.open;
        self.closed_without_merge += other.closed_without_merge;
        self.with_key += other.with_key;
        self.merge_hours_sum += other.merge_hours_sum;
        for (project, count) in other.by_project {
            *self.by_project.entry(project).or_default() += count;
        }
        for (month, count) in other.by_month {
            *self.by_month.entry(month).or_default() += count;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn finish(self) -> MetricsSummary {
        let avg_time_to_merge_hours = if self.merged == 0 {
            0.0
        } else {
            round2(self.merge_hours_sum / self.merged as f64)
        };
        let jira_compliance_rate = if self.total == 0 {
            0.0
        } else {
            round2(self.with_key as f64 / self.total as f64 * 100.0)
        };

        MetricsSummary {
            total_prs: self.total,
            merged_prs: self.merged,
            open_prs: self.open,
            closed_without_merge: self.closed_without_merge,
            with_jira_key: self.with_key,
            without_jira_key: self.total - self.with_key,
            avg_time_to_merge_hours,
            jira_compliance_rate,
            prs_by_project: self.by_project,
            monthly_trend: self.by_month,
        }
    }
}

/// Compute the summary for a batch of pull requests in a single pass.
#[must_use]
pub fn calculate_metrics(prs: &[PullRequest], extractor: &KeyExtractor) -> MetricsSummary {
    let mut acc = MetricsAccumulator::new();
    for pr in prs {
        acc.add(pr, extractor);
    }
    acc.finish()
}

/// Round half away from zero to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summary plus export metadata, as written to `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub summary: MetricsSummary,
    pub repository: String,
    pub export_date: DateTime<Utc>,
    pub period_days: u32,
}

impl MetricsReport {
    #[must_use]
    pub fn new(summary: MetricsSummary, config: &MetricsConfig) -> Self {
        Self {
            summary,
            repository: config.repository.clone(),
            export_date: Utc::now(),
            period_days: config.days_back,
        }
    }
}
