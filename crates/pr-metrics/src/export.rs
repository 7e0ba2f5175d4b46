//! JSON and CSV report files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::MetricsError;
use crate::github::PullRequest;
use crate::metrics::MetricsReport;
use jira_sync::{IssueKey, KeyExtractor};

pub const SUMMARY_JSON: &str = "summary.json";
pub const PULL_REQUESTS_JSON: &str = "pull_requests.json";
pub const PULL_REQUESTS_CSV: &str = "pull_requests.csv";
pub const PROJECT_SUMMARY_CSV: &str = "project_summary.csv";

/// Per-PR detail row, shared by `pull_requests.json` and `pull_requests.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestRow {
    pub number: u64,
    pub jira_key: Option<IssueKey>,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub user: String,
    pub url: String,
}

impl PullRequestRow {
    #[must_use]
    pub fn new(pr: &PullRequest, extractor: &KeyExtractor) -> Self {
        Self {
            number: pr.number,
            jira_key: extractor.first_key(&pr.key_sources()),
            title: pr.title.clone(),
            state: pr.state.clone(),
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            user: pr.login().to_string(),
            url: pr.html_url.clone(),
        }
    }
}

/// Writes the metrics report set into one directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// Create the exporter, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, MetricsError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write all four report files, overwriting previous exports.
    pub fn export(
        &self,
        report: &MetricsReport,
        prs: &[PullRequest],
        extractor: &KeyExtractor,
    ) -> Result<(), MetricsError> {
        let rows: Vec<PullRequestRow> = prs
            .iter()
            .map(|pr| PullRequestRow::new(pr, extractor))
            .collect();

        self.write_json(SUMMARY_JSON, report)?;
        self.write_json(PULL_REQUESTS_JSON, &rows)?;
        self.write_pull_requests_csv(&rows)?;
        self.write_project_summary_csv(report)?;

        info!(
            dir = %self.output_dir.display(),
            prs = rows.len(),
            "Metrics exported"
        );
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), MetricsError> {
        let path = self.output_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        debug!(path = %path.display(), "Wrote JSON report");
        Ok(())
    }

    fn write_pull_requests_csv(&self, rows: &[PullRequestRow]) -> Result<(), MetricsError> {
        let path = self.output_dir.join(PULL_REQUESTS_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        if rows.is_empty() {
            // serialize() only emits the header alongside the first record
            writer.write_record([
                "number", "jira_key", "title", "state", "created_at", "merged_at", "user", "url",
            ])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), "Wrote CSV report");
        Ok(())
    }

    fn write_project_summary_csv(&self, report: &MetricsReport) -> Result<(), MetricsError> {
        let path = self.output_dir.join(PROJECT_SUMMARY_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["Project", "PR Count"])?;
        for (project, count) in &report.summary.prs_by_project {
            writer.write_record([project.as_str(), count.to_string().as_str()])?;
        }
        writer.flush()?;
        debug!(path = %path.display(), "Wrote CSV report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::metrics::calculate_metrics;
    use serde_json::json;
    use tempfile::TempDir;

    fn prs() -> Vec<PullRequest> {
        serde_json::from_value(json!([
            {
                "number": 2,
                "title": "Fix, with comma",
                "body": null,
                "state": "closed",
                "head": { "ref": "SECO-42-fix" },
                "user": { "login": "alice" },
                "html_url": "https://github.com/acme/app/pull/2",
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-02T10:00:00Z",
                "merged_at": "2024-03-01T12:00:00Z"
            },
            {
                "number": 3,
                "title": "Docs",
                "body": null,
                "state": "open",
                "head": { "ref": "docs" },
                "user": null,
                "html_url": "https://github.com/acme/app/pull/3",
                "created_at": "2024-03-02T10:00:00Z",
                "updated_at": "2024-03-02T11:00:00Z",
                "merged_at": null
            }
        ]))
        .unwrap()
    }

    fn report(prs: &[PullRequest]) -> MetricsReport {
        let config = MetricsConfig::from_lookup(|var| {
            (var == "GITHUB_REPOSITORY").then(|| "acme/app".to_string())
        })
        .unwrap();
        MetricsReport::new(calculate_metrics(prs, &KeyExtractor::default()), &config)
    }

    #[test]
    fn test_export_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/metrics");
        let prs = prs();

        let exporter = Exporter::new(&out).unwrap();
        exporter.export(&report(&prs), &prs, &KeyExtractor::default()).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_JSON)).unwrap()).unwrap();
        assert_eq!(summary["total_prs"], 2);
        assert_eq!(summary["repository"], "acme/app");

        let rows: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(PULL_REQUESTS_JSON)).unwrap())
                .unwrap();
        assert_eq!(rows[0]["jira_key"], "SECO-42");
        assert!(rows[1]["jira_key"].is_null());
        assert!(rows[1]["merged_at"].is_null());

        let csv = fs::read_to_string(out.join(PULL_REQUESTS_CSV)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("number,jira_key,title,state,created_at,merged_at,user,url")
        );
        assert_eq!(
            lines.next(),
            Some("2,SECO-42,\"Fix, with comma\",closed,2024-03-01T10:00:00Z,2024-03-01T12:00:00Z,alice,https://github.com/acme/app/pull/2")
        );
        assert_eq!(
            lines.next(),
            Some("3,,Docs,open,2024-03-02T10:00:00Z,,,https://github.com/acme/app/pull/3")
        );

        let projects = fs::read_to_string(out.join(PROJECT_SUMMARY_CSV)).unwrap();
        assert_eq!(projects, "Project,PR Count\nSECO,1\n");
    }

    #[test]
    fn test_empty_export_keeps_headers() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path()).unwrap();
        exporter.export(&report(&[]), &[], &KeyExtractor::default()).unwrap();

        let csv = fs::read_to_string(dir.path().join(PULL_REQUESTS_CSV)).unwrap();
        assert_eq!(csv, "number,jira_key,title,state,created_at,merged_at,user,url\n");
        let projects = fs::read_to_string(dir.path().join(PROJECT_SUMMARY_CSV)).unwrap();
        assert_eq!(projects, "Project,PR Count\n");
        assert_eq!(
            fs::read_to_string(dir.path().join(PULL_REQUESTS_JSON)).unwrap(),
            "[]"
        );
    }
}
