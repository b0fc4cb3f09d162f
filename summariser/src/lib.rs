use crate::builder::ReportBuilder;
use crate::event::extract_events;
use crate::metrics::{ExternalMetrics, MetricsAggregator};
use crate::outcome::{scenarios_from_outcomes, ScenarioOutcome};
use crate::reconcile::{declared_total, ReconciliationPolicy};
use crate::reconstruct::{CorrelationStrategy, LooseCorrelation, ScenarioReconstructor};
use chrono::{DateTime, Utc};
use dashboard_qa_report_model::{ReportModel, ScenarioResult, Viewport};

pub mod builder;
pub mod event;
pub mod generator;
pub mod issues;
pub mod metrics;
pub mod outcome;
pub mod reconcile;
pub mod reconstruct;

/// Decode raw log bytes, replacing invalid UTF-8 so the rest of the log stays usable
pub fn decode_log(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        log::debug!("Log contains invalid UTF-8, replaced with U+FFFD");
    }
    text.into_owned()
}

/// What is known about a run apart from its log
#[derive(Debug, Clone, Default)]
pub struct RunHints {
    /// Expected number of scenarios. Takes precedence over a `Total scenarios` marker in the log.
    pub declared_total: Option<usize>,
    pub metrics: ExternalMetrics,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub screenshots: Vec<String>,
}

/// Turns a test run's log, or the outcomes reported by the scenario runner, into a report.
///
/// Summarising never fails. Missing or unusable input produces a report of the default scenarios.
#[derive(Debug, Clone, Default)]
pub struct Summariser<C = LooseCorrelation> {
    policy: ReconciliationPolicy,
    correlation: C,
}

impl Summariser<LooseCorrelation> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: CorrelationStrategy + Clone> Summariser<C> {
    pub fn with_policy(mut self, policy: ReconciliationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_correlation<D: CorrelationStrategy + Clone>(self, correlation: D) -> Summariser<D> {
        Summariser {
            policy: self.policy,
            correlation,
        }
    }

    /// Reconstruct and reconcile the scenarios described by a log
    pub fn scenarios_from_log(
        &self,
        log: &str,
        declared: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<ScenarioResult> {
        let reconstruction =
            ScenarioReconstructor::with_correlation(self.correlation.clone(), now)
                .reconstruct(extract_events(log));
        if reconstruction.dropped_events > 0 {
            log::debug!(
                "{} completion or failure lines did not match an open scenario",
                reconstruction.dropped_events
            );
        }

        let declared = declared.or_else(|| declared_total(log));
        self.policy.reconcile(reconstruction, log, declared, now)
    }

    /// Summarise a run from its log. `None` means no log could be read.
    pub fn summarise_log(
        &self,
        log: Option<&str>,
        hints: RunHints,
        now: DateTime<Utc>,
    ) -> ReportModel {
        let aggregator = MetricsAggregator::new().merge(hints.metrics.clone());

        let (scenarios, metrics) = match log {
            Some(log) => {
                let scenarios = self.scenarios_from_log(log, hints.declared_total, now);
                let metrics = aggregator.scan_log(log, now).finish(&scenarios);
                (scenarios, metrics)
            }
            None => {
                log::warn!("No log available, reporting the default scenarios");
                (self.policy.default_set(now), aggregator.finish_without_log())
            }
        };

        build(scenarios, metrics, hints, now)
    }

    /// Summarise a run from the outcomes reported by the scenario runner.
    ///
    /// The log, if any, is only used for metrics.
    pub fn summarise_outcomes(
        &self,
        outcomes: &[ScenarioOutcome],
        log: Option<&str>,
        hints: RunHints,
        now: DateTime<Utc>,
    ) -> ReportModel {
        let scenarios = if outcomes.is_empty() {
            log::warn!("No scenario outcomes reported, using the default scenarios");
            self.policy.default_set(now)
        } else {
            scenarios_from_outcomes(outcomes, now)
        };

        let aggregator = MetricsAggregator::new().merge(hints.metrics.clone());
        let metrics = match log {
            Some(log) => aggregator.scan_log(log, now).finish(&scenarios),
            None => aggregator.finish(&scenarios),
        };

        build(scenarios, metrics, hints, now)
    }
}

fn build(
    scenarios: Vec<ScenarioResult>,
    metrics: dashboard_qa_report_model::ReportMetrics,
    hints: RunHints,
    now: DateTime<Utc>,
) -> ReportModel {
    ReportBuilder::new(scenarios, metrics, now)
        .url(hints.url)
        .user_agent(hints.user_agent)
        .viewport(hints.viewport)
        .started_at(hints.started_at)
        .ended_at(hints.ended_at)
        .screenshots(hints.screenshots)
        .build()
}
