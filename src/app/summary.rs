//! Run summary and result aggregation
//!
//! Collects the per-object outcomes of a run into a [`RunSummary`], reports
//! failures to the operator and optionally persists a JSON report.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::app::models::FetchOutcome;

/// Outcomes of one run plus timing
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
    pub outcomes: Vec<FetchOutcome>,
}

impl RunSummary {
    pub fn success_count(&self) -> usize {
        self.downloaded + self.cached
    }

    pub fn failure_count(&self) -> usize {
        self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Failed outcomes, in arrival order
    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failure())
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Log totals, then each failure at warn level
    pub fn report(&self) {
        info!(
            "Processed {} files in {}: {} downloaded, {} already cached, {} failed",
            self.total,
            format_duration(self.duration()),
            self.downloaded,
            self.cached,
            self.failed
        );

        if self.failed == 0 {
            return;
        }

        warn!("{} files failed to download.", self.failed);
        for failure in self.failures() {
            warn!(
                "  {}: {}",
                failure.object(),
                failure.message().unwrap_or_default()
            );
        }
    }

    /// Operator-facing text block
    pub fn render(&self) -> String {
        let mut text = format!(
            "Sync finished in {}\n  Total:      {}\n  Downloaded: {}\n  Cached:     {}\n  Failed:     {}\n",
            format_duration(self.duration()),
            self.total,
            self.downloaded,
            self.cached,
            self.failed
        );

        if self.failed > 0 {
            text.push_str(&format!("\n{} files failed to download:\n", self.failed));
            for failure in self.failures() {
                text.push_str(&format!(
                    "  {} ({})\n",
                    failure.object(),
                    failure.message().unwrap_or_default()
                ));
            }
        }

        text
    }

    /// Write the summary as pretty-printed JSON
    pub async fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, json).await?;
        info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

/// Builds run summaries from executor outcomes
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// Partition outcomes and count them
    pub fn aggregate(outcomes: Vec<FetchOutcome>, started_at: DateTime<Utc>) -> RunSummary {
        let mut downloaded = 0;
        let mut cached = 0;
        let mut failed = 0;

        for outcome in &outcomes {
            if outcome.is_failure() {
                failed += 1;
            } else if outcome.is_cached() {
                cached += 1;
            } else {
                downloaded += 1;
            }
        }

        RunSummary {
            started_at,
            finished_at: Utc::now(),
            total: outcomes.len(),
            downloaded,
            cached,
            failed,
            outcomes,
        }
    }
}

/// Format a duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{ObjectKind, RemoteObjectRef};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn object(key: &str) -> RemoteObjectRef {
        RemoteObjectRef::new("data", key, ObjectKind::Leaf)
    }

    fn sample_outcomes() -> Vec<FetchOutcome> {
        vec![
            FetchOutcome::downloaded(object("a.tif"), PathBuf::from("data/data/a.tif")),
            FetchOutcome::failure(object("b.tif"), "Server error: HTTP 503"),
            FetchOutcome::cached(object("c.tif"), PathBuf::from("data/data/c.tif")),
        ]
    }

    /// Partial failure is isolated to the failing object
    #[test]
    fn test_aggregate_counts() {
        let summary = ResultAggregator::aggregate(sample_outcomes(), Utc::now());

        assert_eq!(summary.total, 3);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.success_count(), 2);
        assert_eq!(summary.failure_count(), 1);
        assert!(summary.has_failures());

        let failures: Vec<_> = summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].object().key(), "b.tif");
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = ResultAggregator::aggregate(Vec::new(), Utc::now());
        assert_eq!(summary.total, 0);
        assert!(!summary.has_failures());
        assert!(summary.render().contains("Total:      0"));
        summary.report();
    }

    #[test]
    fn test_render_lists_failures() {
        let summary = ResultAggregator::aggregate(sample_outcomes(), Utc::now());
        let text = summary.render();

        assert!(text.contains("1 files failed to download:"));
        assert!(text.contains("az://data/b.tif (Server error: HTTP 503)"));
        assert!(!text.contains("a.tif ("));
    }

    #[tokio::test]
    async fn test_write_json_report() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports/run.json");
        let summary = ResultAggregator::aggregate(sample_outcomes(), Utc::now());

        summary.write_json(&path).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][1]["status"], "failure");
        assert_eq!(json["outcomes"][2]["source"], "cached");
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h1m");
    }
}
