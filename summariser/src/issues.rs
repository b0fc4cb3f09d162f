use dashboard_qa_report_model::{ReportModel, ScenarioStatus};
use std::fmt;

/// Load times above this many milliseconds are reported as an issue
pub const SLOW_LOAD_THRESHOLD_MS: f64 = 3000.0;
/// Average response times above this many milliseconds are reported as an issue
pub const SLOW_RESPONSE_THRESHOLD_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// A problem found in a report, with a suggestion for what to do about it
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub recommendation: String,
}

/// Apply the threshold rules to a report. Issues are ordered by severity, most severe first.
pub fn derive_issues(report: &ReportModel) -> Vec<Issue> {
    let mut issues = Vec::new();
    let metrics = report.metrics();

    for scenario in report.scenarios() {
        match scenario.status {
            ScenarioStatus::Failed => issues.push(Issue {
                severity: Severity::High,
                title: format!("Scenario failed: {}", scenario.name),
                detail: scenario
                    .error
                    .clone()
                    .unwrap_or_else(|| "No failure reason recorded".to_string()),
                recommendation: "Reproduce the scenario locally and check the screenshots taken around the failure".to_string(),
            }),
            ScenarioStatus::Warning => issues.push(Issue {
                severity: Severity::Low,
                title: format!("Scenario reported warnings: {}", scenario.name),
                detail: scenario.warnings.join("; "),
                recommendation: "Review the warnings, they may indicate flaky or degraded behaviour".to_string(),
            }),
            ScenarioStatus::Passed | ScenarioStatus::Running => {}
        }
    }

    if metrics.load_time > SLOW_LOAD_THRESHOLD_MS {
        issues.push(Issue {
            severity: Severity::Medium,
            title: "Slow initial load".to_string(),
            detail: format!(
                "Initial load took {}ms, above the {}ms threshold",
                metrics.load_time, SLOW_LOAD_THRESHOLD_MS
            ),
            recommendation: "Reduce the initial bundle size or defer loading of non-critical widgets".to_string(),
        });
    }

    if metrics.average_response_time > SLOW_RESPONSE_THRESHOLD_MS {
        issues.push(Issue {
            severity: Severity::Medium,
            title: "Slow responses".to_string(),
            detail: format!(
                "Average response time was {}ms, above the {}ms threshold",
                metrics.average_response_time, SLOW_RESPONSE_THRESHOLD_MS
            ),
            recommendation: "Profile the slowest dashboard queries and consider caching their results".to_string(),
        });
    }

    let timeouts = metrics
        .errors
        .iter()
        .filter(|e| e.message.to_lowercase().contains("timeout"))
        .count();
    if timeouts > 0 {
        issues.push(Issue {
            severity: Severity::High,
            title: "Timeouts".to_string(),
            detail: format!("{timeouts} error(s) mention a timeout"),
            recommendation: "Check that the dashboard backend is reachable and increase wait times for slow widgets".to_string(),
        });
    }

    issues.sort_by_key(|i| i.severity);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dashboard_qa_report_model::{
        Environment, MetricError, ReportMetrics, ScenarioResult, Viewport,
    };

    fn report(scenarios: Vec<ScenarioResult>, metrics: ReportMetrics) -> ReportModel {
        let now = Utc::now();
        ReportModel::new(
            Environment {
                url: "http://localhost".to_string(),
                user_agent: "test".to_string(),
                viewport: Viewport::default(),
                timestamp: now,
            },
            now,
            now,
            scenarios,
            metrics,
            vec![],
        )
    }

    fn metrics(load_time: f64, average_response_time: f64, errors: &[&str]) -> ReportMetrics {
        ReportMetrics {
            load_time,
            average_response_time,
            errors: errors
                .iter()
                .map(|m| MetricError {
                    message: m.to_string(),
                    timestamp: Utc::now(),
                    scenario: "Unknown".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn healthy_report_has_no_issues() {
        let now = Utc::now();
        let report = report(
            vec![ScenarioResult::synthesised(1, "A", now)],
            metrics(3000.0, 1000.0, &["Error: element not found"]),
        );
        assert!(derive_issues(&report).is_empty());
    }

    #[test]
    fn flags_slow_metrics_and_timeouts() {
        let report = report(
            vec![],
            metrics(3001.0, 1500.0, &["failed: TimeOut after 30s", "Error: timeout"]),
        );
        let issues = derive_issues(&report);
        let titles: Vec<_> = issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(vec!["Timeouts", "Slow initial load", "Slow responses"], titles);
        assert!(issues[0].detail.starts_with("2 "));
    }

    #[test]
    fn flags_failed_and_warned_scenarios() {
        let now = Utc::now();
        let mut warned = ScenarioResult::synthesised(2, "B", now);
        warned.status = ScenarioStatus::Warning;
        warned.warnings = vec!["slow".to_string(), "retried".to_string()];

        let report = report(
            vec![ScenarioResult::failed(1, "A", "boom", now), warned],
            metrics(0.0, 0.0, &[]),
        );
        let issues = derive_issues(&report);
        assert_eq!(2, issues.len());
        assert_eq!(Severity::High, issues[0].severity);
        assert_eq!("boom", issues[0].detail);
        assert_eq!("slow; retried", issues[1].detail);
    }
}
