use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::fmt;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// Duration recorded for a scenario when it could not be measured, in milliseconds.
pub const PLACEHOLDER_DURATION_MS: u64 = 5000;

/// Name recorded against an error that could not be attributed to a scenario.
pub const UNKNOWN_SCENARIO: &str = "Unknown";

/// Outcome of a single scenario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// The scenario has started but no outcome has been seen yet.
    ///
    /// Only used while a log is being read, never present in a finished report.
    Running,
    Passed,
    Failed,
    Warning,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Running => write!(f, "running"),
            ScenarioStatus::Passed => write!(f, "passed"),
            ScenarioStatus::Failed => write!(f, "failed"),
            ScenarioStatus::Warning => write!(f, "warning"),
        }
    }
}

/// The result of one scenario in a test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Sequence number, assigned in discovery order and starting at 1
    pub id: u32,
    /// The scenario label
    ///
    /// Not guaranteed to be unique when entries have been synthesised to fill gaps in a log.
    pub name: String,
    pub status: ScenarioStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration: u64,
    pub warnings: Vec<String>,
    /// Failure reason, only set when [ScenarioResult::status] is [ScenarioStatus::Failed]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Open a new scenario that is still running
    pub fn running(id: u32, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            status: ScenarioStatus::Running,
            start_time: now,
            end_time: now,
            duration: PLACEHOLDER_DURATION_MS,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Create a passed scenario that was not observed directly, using the placeholder duration
    pub fn synthesised(id: u32, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: ScenarioStatus::Passed,
            ..Self::running(id, name, now)
        }
    }

    /// Create a failed scenario
    pub fn failed(
        id: u32,
        name: impl Into<String>,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: ScenarioStatus::Failed,
            error: Some(error.into()),
            ..Self::running(id, name, now)
        }
    }
}

/// An error line captured from a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The scenario the error belongs to, or [UNKNOWN_SCENARIO]
    pub scenario: String,
}

/// Performance metrics for a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    /// Initial load time of the dashboard, in milliseconds
    pub load_time: f64,
    /// Average response time, in milliseconds
    pub average_response_time: f64,
    /// Errors in the order they were seen. Never deduplicated.
    pub errors: Vec<MetricError>,
}

impl ReportMetrics {
    /// Metrics for a run that produced no input at all
    pub fn zeroed() -> Self {
        Self {
            load_time: 0.0,
            average_response_time: 0.0,
            errors: Vec::new(),
        }
    }
}

/// Counts derived from the scenarios of a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warning: usize,
    /// Percentage of passed scenarios, `0` when there are no scenarios
    pub success_rate: f64,
}

impl ReportSummary {
    /// Count the scenario statuses
    ///
    /// A scenario that is somehow still running is counted as passed, so that
    /// `total = passed + failed + warning` always holds.
    pub fn from_scenarios(scenarios: &[ScenarioResult]) -> Self {
        let counts = scenarios.iter().counts_by(|s| s.status);
        let count = |status: ScenarioStatus| counts.get(&status).copied().unwrap_or(0);

        let passed = count(ScenarioStatus::Passed) + count(ScenarioStatus::Running);
        let failed = count(ScenarioStatus::Failed);
        let warning = count(ScenarioStatus::Warning);
        let total = passed + failed + warning;

        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            passed,
            failed,
            warning,
            success_rate,
        }
    }
}

/// Browser viewport the run was executed with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where and how the run was executed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// The dashboard URL under test
    pub url: String,
    pub user_agent: String,
    pub viewport: Viewport,
    pub timestamp: DateTime<Utc>,
}

/// The complete outcome of one test run
///
/// Built once per run. The summary is derived from the scenarios when the model is created and
/// the fields are only exposed for reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    environment: Environment,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// Duration of the run in milliseconds
    duration: u64,
    scenarios: Vec<ScenarioResult>,
    metrics: ReportMetrics,
    summary: ReportSummary,
    screenshots: Vec<String>,
}

impl ReportModel {
    /// Create a new report, deriving the duration and the summary
    pub fn new(
        environment: Environment,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        scenarios: Vec<ScenarioResult>,
        metrics: ReportMetrics,
        screenshots: Vec<String>,
    ) -> Self {
        let duration = (end_time - start_time).num_milliseconds().max(0) as u64;
        let summary = ReportSummary::from_scenarios(&scenarios);

        Self {
            environment,
            start_time,
            end_time,
            duration,
            scenarios,
            metrics,
            summary,
            screenshots,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn scenarios(&self) -> &[ScenarioResult] {
        &self.scenarios
    }

    pub fn metrics(&self) -> &ReportMetrics {
        &self.metrics
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn screenshots(&self) -> &[String] {
        &self.screenshots
    }

    /// Compute a fingerprint for the outcome of this report
    ///
    /// The fingerprint is intended to identify runs that produced the same outcome. It uses the
    ///     - Target URL
    ///     - Scenario ids, names, statuses and errors
    ///     - Summary counts
    ///
    /// Timestamps and metrics are not included. The fingerprint is computed using
    /// [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.environment.url.as_bytes());
        self.scenarios
            .iter()
            .sorted_by_key(|s| s.id)
            .for_each(|s| {
                Digest::update(&mut hasher, s.id.to_le_bytes());
                Digest::update(&mut hasher, s.name.as_bytes());
                Digest::update(&mut hasher, s.status.to_string().as_bytes());
                if let Some(error) = &s.error {
                    Digest::update(&mut hasher, error.as_bytes());
                }
            });
        for count in [
            self.summary.total,
            self.summary.passed,
            self.summary.failed,
            self.summary.warning,
        ] {
            Digest::update(&mut hasher, (count as u64).to_le_bytes());
        }

        format!("{:x}", hasher.finalize())
    }
}

/// Serialize the report to a writer as pretty JSON
pub fn store_report<W: Write>(report: &ReportModel, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Load a report from a reader
pub fn load_report<R: Read>(reader: R) -> anyhow::Result<ReportModel> {
    let reader = std::io::BufReader::new(reader);
    let report: ReportModel = serde_json::from_reader(reader)?;
    Ok(report)
}

/// Append the report to a history file
///
/// The report will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_report_history(report: &ReportModel, path: PathBuf) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    serde_json::to_writer(&mut file, report)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Load reports from a history file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_report_history].
pub fn load_report_history(path: PathBuf) -> anyhow::Result<Vec<ReportModel>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut reports = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let report: ReportModel = serde_json::from_str(&line)?;
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(now: DateTime<Utc>) -> Environment {
        Environment {
            url: "http://localhost:3000".to_string(),
            user_agent: "test-agent".to_string(),
            viewport: Viewport::default(),
            timestamp: now,
        }
    }

    fn sample_report() -> ReportModel {
        let now = Utc::now();
        let mut warned = ScenarioResult::synthesised(3, "Data Export", now);
        warned.status = ScenarioStatus::Warning;
        warned.warnings.push("slow chart render".to_string());

        ReportModel::new(
            environment(now),
            now,
            now + chrono::Duration::milliseconds(1500),
            vec![
                ScenarioResult::synthesised(1, "Tab Navigation", now),
                ScenarioResult::failed(2, "Dashboard Controls", "timeout", now),
                warned,
            ],
            ReportMetrics::zeroed(),
            vec![],
        )
    }

    #[test]
    fn summary_counts_statuses() {
        let report = sample_report();
        let summary = report.summary();

        assert_eq!(3, summary.total);
        assert_eq!(1, summary.passed);
        assert_eq!(1, summary.failed);
        assert_eq!(1, summary.warning);
        assert_eq!(summary.total, summary.passed + summary.failed + summary.warning);
        assert!((summary.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(1500, report.duration());
    }

    #[test]
    fn summary_of_no_scenarios_has_zero_success_rate() {
        let summary = ReportSummary::from_scenarios(&[]);
        assert_eq!(0, summary.total);
        assert_eq!(0.0, summary.success_rate);
    }

    #[test]
    fn end_before_start_gives_zero_duration() {
        let now = Utc::now();
        let report = ReportModel::new(
            environment(now),
            now,
            now - chrono::Duration::seconds(5),
            vec![],
            ReportMetrics::zeroed(),
            vec![],
        );
        assert_eq!(0, report.duration());
    }

    #[test]
    fn serialises_with_stable_field_names() -> anyhow::Result<()> {
        let report = sample_report();
        let value = serde_json::to_value(&report)?;

        assert!(value.get("startTime").is_some());
        assert!(value["summary"].get("successRate").is_some());
        assert!(value["metrics"].get("averageResponseTime").is_some());
        assert!(value["environment"].get("userAgent").is_some());
        assert_eq!("failed", value["scenarios"][1]["status"]);
        assert_eq!("timeout", value["scenarios"][1]["error"]);
        assert!(value["scenarios"][0].get("error").is_none());

        Ok(())
    }

    #[test]
    fn store_and_load_report() -> anyhow::Result<()> {
        let report = sample_report();
        let mut buf = Vec::new();
        store_report(&report, &mut buf)?;

        let loaded = load_report(buf.as_slice())?;
        assert_eq!(report.scenarios(), loaded.scenarios());
        assert_eq!(report.environment(), loaded.environment());
        assert_eq!(report.fingerprint(), loaded.fingerprint());

        Ok(())
    }

    #[test]
    fn history_appends_one_line_per_report() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report_history.jsonl");

        let report = sample_report();
        append_report_history(&report, path.clone())?;
        append_report_history(&report, path.clone())?;

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.ends_with('\n'));
        assert_eq!(2, raw.lines().count());

        let history = load_report_history(path)?;
        assert_eq!(2, history.len());
        assert_eq!(report.fingerprint(), history[1].fingerprint());

        Ok(())
    }

    #[test]
    fn fingerprint_ignores_timestamps_but_not_outcomes() {
        let first = sample_report();
        let second = sample_report();
        assert_eq!(first.fingerprint(), second.fingerprint());

        let now = Utc::now();
        let changed = ReportModel::new(
            environment(now),
            now,
            now,
            vec![ScenarioResult::synthesised(1, "Tab Navigation", now)],
            ReportMetrics::zeroed(),
            vec![],
        );
        assert_ne!(first.fingerprint(), changed.fingerprint());
    }
}
