use chrono::{DateTime, Utc};
use dashboard_qa_report_model::{MetricError, ReportMetrics, ScenarioResult, UNKNOWN_SCENARIO};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_LOAD_TIME_MS: f64 = 3000.0;
pub const DEFAULT_AVERAGE_RESPONSE_TIME_MS: f64 = 500.0;

static LOAD_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)initial load time:\s*(\d+(?:\.\d+)?)\s*ms").expect("valid load time pattern")
});

static AVERAGE_RESPONSE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)average response time:\s*(\d+(?:\.\d+)?)\s*ms")
        .expect("valid response time pattern")
});

static ERROR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:error:|failed:)[^\r\n]*").expect("valid error pattern"));

/// Metrics supplied directly by whoever ran the scenarios
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalMetrics {
    pub load_time: Option<f64>,
    pub average_response_time: Option<f64>,
    pub errors: Vec<MetricError>,
}

/// Collects metrics from several sources.
///
/// The first source to set a field wins, so external metrics should be merged before the log is
/// scanned. Errors from every source are kept, in the order they were added.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    load_time: Option<f64>,
    average_response_time: Option<f64>,
    errors: Vec<MetricError>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(mut self, external: ExternalMetrics) -> Self {
        set_once(&mut self.load_time, external.load_time, "load time");
        set_once(
            &mut self.average_response_time,
            external.average_response_time,
            "average response time",
        );
        self.errors.extend(external.errors);
        self
    }

    pub fn scan_log(mut self, log: &str, now: DateTime<Utc>) -> Self {
        set_once(&mut self.load_time, marker_value(&LOAD_TIME, log), "load time");
        set_once(
            &mut self.average_response_time,
            marker_value(&AVERAGE_RESPONSE_TIME, log),
            "average response time",
        );
        self.errors.extend(scan_errors(log, now));
        self
    }

    /// Fill any unset field from the scenarios, or from the defaults
    pub fn finish(self, scenarios: &[ScenarioResult]) -> ReportMetrics {
        let average_response_time = self.average_response_time.unwrap_or_else(|| {
            if scenarios.is_empty() {
                DEFAULT_AVERAGE_RESPONSE_TIME_MS
            } else {
                scenarios.iter().map(|s| s.duration as f64).sum::<f64>() / scenarios.len() as f64
            }
        });

        ReportMetrics {
            load_time: self.load_time.unwrap_or(DEFAULT_LOAD_TIME_MS),
            average_response_time,
            errors: self.errors,
        }
    }

    /// Fill any unset field with zero, for runs where no log was available at all
    pub fn finish_without_log(self) -> ReportMetrics {
        ReportMetrics {
            load_time: self.load_time.unwrap_or(0.0),
            average_response_time: self.average_response_time.unwrap_or(0.0),
            errors: self.errors,
        }
    }
}

/// Capture every error line in a log.
///
/// Errors are not attributed to the scenario that was running when they were logged.
pub fn scan_errors(log: &str, now: DateTime<Utc>) -> Vec<MetricError> {
    ERROR_LINE
        .find_iter(log)
        .map(|m| MetricError {
            message: m.as_str().trim_end().to_string(),
            timestamp: now,
            scenario: UNKNOWN_SCENARIO.to_string(),
        })
        .collect()
}

fn marker_value(pattern: &Regex, log: &str) -> Option<f64> {
    pattern
        .captures(log)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

fn set_once(field: &mut Option<f64>, value: Option<f64>, name: &str) {
    let Some(v) = value else {
        return;
    };

    if let Some(existing) = field {
        log::trace!("Keeping {name} of {existing}ms, ignoring {v}ms");
    } else if v.is_finite() && v >= 0.0 {
        *field = Some(v);
    } else {
        log::warn!("Ignoring invalid {name}: {v}");
    }
}
