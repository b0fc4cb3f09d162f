use chrono::{DateTime, Utc};
use dashboard_qa_report_model::{
    Environment, ReportMetrics, ReportModel, ScenarioResult, ScenarioStatus, Viewport,
};

pub const DEFAULT_URL: &str = "about:blank";
pub const DEFAULT_USER_AGENT: &str = concat!("dashboard-qa-summariser/", env!("CARGO_PKG_VERSION"));

/// Assembles a [ReportModel] from scenarios, metrics and whatever is known about the run.
///
/// Anything not supplied is defaulted: timestamps to the time the builder was created, the
/// environment to [DEFAULT_URL], [DEFAULT_USER_AGENT] and [Viewport::default].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    scenarios: Vec<ScenarioResult>,
    metrics: ReportMetrics,
    now: DateTime<Utc>,
    url: Option<String>,
    user_agent: Option<String>,
    viewport: Option<Viewport>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    screenshots: Vec<String>,
}

impl ReportBuilder {
    pub fn new(scenarios: Vec<ScenarioResult>, metrics: ReportMetrics, now: DateTime<Utc>) -> Self {
        Self {
            scenarios,
            metrics,
            now,
            url: None,
            user_agent: None,
            viewport: None,
            started_at: None,
            ended_at: None,
            screenshots: Vec::new(),
        }
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn viewport(mut self, viewport: Option<Viewport>) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn ended_at(mut self, ended_at: Option<DateTime<Utc>>) -> Self {
        self.ended_at = ended_at;
        self
    }

    pub fn screenshots(mut self, screenshots: Vec<String>) -> Self {
        self.screenshots = screenshots;
        self
    }

    pub fn build(self) -> ReportModel {
        let scenarios = self
            .scenarios
            .into_iter()
            .map(|mut s| {
                if s.status == ScenarioStatus::Running {
                    s.status = ScenarioStatus::Passed;
                }
                s
            })
            .collect::<Vec<_>>();

        let environment = Environment {
            url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            viewport: self.viewport.unwrap_or_default(),
            timestamp: self.now,
        };

        let start_time = self.started_at.unwrap_or(self.now);
        let end_time = self.ended_at.unwrap_or(self.now);

        let report = ReportModel::new(
            environment,
            start_time,
            end_time,
            scenarios,
            self.metrics,
            self.screenshots,
        );

        let summary = report.summary();
        log::info!(
            "Report built: {} scenarios, {} passed, {} failed, {} with warnings",
            summary.total,
            summary.passed,
            summary.failed,
            summary.warning
        );

        report
    }
}
