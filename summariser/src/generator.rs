use crate::issues::derive_issues;
use anyhow::Context;
use dashboard_qa_report_model::{append_report_history, store_report, ReportModel};
use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// File name of the JSON-lines history written by [FullReportGenerator]
pub const HISTORY_FILE_NAME: &str = "report_history.jsonl";

/// Writes a finished report somewhere a person or another tool can pick it up.
pub trait ReportGenerator {
    /// Write the report into `out_dir`, returning the paths that were written
    fn generate(&self, report: &ReportModel, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>>;
}

/// Writes the JSON snapshot, a plain text summary and appends to the report history
#[derive(Debug, Default, Clone, Copy)]
pub struct FullReportGenerator;

impl ReportGenerator for FullReportGenerator {
    fn generate(&self, report: &ReportModel, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let json_path = write_json_snapshot(report, out_dir)?;

        let text_path = json_path.with_extension("txt");
        std::fs::write(&text_path, render_summary(report))
            .with_context(|| format!("Failed to write summary to {}", text_path.display()))?;

        let history_path = out_dir.join(HISTORY_FILE_NAME);
        append_report_history(report, history_path.clone())
            .context("Failed to append to report history")?;

        Ok(vec![json_path, text_path, history_path])
    }
}

/// Writes only the JSON snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalReportGenerator;

impl ReportGenerator for MinimalReportGenerator {
    fn generate(&self, report: &ReportModel, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        Ok(vec![write_json_snapshot(report, out_dir)?])
    }
}

fn write_json_snapshot(report: &ReportModel, out_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let path = out_dir.join(format!(
        "report-{}.json",
        report.end_time().format("%Y-%m-%dT%H.%M.%S%.fZ")
    ));
    log::debug!("Writing report snapshot to {}", path.display());

    let mut file = File::create_new(&path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    store_report(report, &mut file).context("Failed to write report")?;

    Ok(path)
}

#[derive(Tabled)]
struct ScenarioRow {
    #[tabled(rename = "#")]
    id: u32,
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Duration (ms)")]
    duration: u64,
    #[tabled(rename = "Notes")]
    notes: String,
}

/// Render the scenario table followed by the summary, metrics and issues
pub fn render_summary(report: &ReportModel) -> String {
    let rows = report
        .scenarios()
        .iter()
        .map(|s| ScenarioRow {
            id: s.id,
            name: s.name.clone(),
            status: s.status.to_string(),
            duration: s.duration,
            notes: s.error.clone().unwrap_or_else(|| s.warnings.join("; ")),
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(&rows);
    table.with(Style::modern());

    let summary = report.summary();
    let metrics = report.metrics();
    let environment = report.environment();

    let mut out = String::new();
    let _ = writeln!(out, "Dashboard QA report for {}", environment.url);
    let _ = writeln!(
        out,
        "User agent: {}, viewport: {}",
        environment.user_agent, environment.viewport
    );
    let _ = writeln!(out, "Duration: {}ms\n", report.duration());
    let _ = writeln!(out, "{table}\n");
    let _ = writeln!(
        out,
        "Total: {}, passed: {}, failed: {}, warnings: {}, success rate: {:.1}%",
        summary.total, summary.passed, summary.failed, summary.warning, summary.success_rate
    );
    let _ = writeln!(
        out,
        "Initial load time: {}ms, average response time: {}ms, errors: {}",
        metrics.load_time,
        metrics.average_response_time,
        metrics.errors.len()
    );

    let issues = derive_issues(report);
    if issues.is_empty() {
        let _ = writeln!(out, "\nNo issues found");
    } else {
        let _ = writeln!(out, "\nIssues");
        for issue in issues {
            let _ = writeln!(
                out,
                "  [{}] {}: {}\n      Recommendation: {}",
                issue.severity, issue.title, issue.detail, issue.recommendation
            );
        }
    }

    out
}
