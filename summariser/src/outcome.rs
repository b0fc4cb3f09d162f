use crate::reconstruct::GENERIC_FAILURE;
use chrono::{DateTime, Utc};
use dashboard_qa_report_model::ScenarioResult;
use serde::{Deserialize, Serialize};

/// A scenario outcome reported by whatever executed the scenarios
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioOutcome {
    pub name: String,
    /// `success` or `passed` for a passing scenario, anything else is a failure
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScenarioOutcome {
    pub fn is_success(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case("success") || status.eq_ignore_ascii_case("passed")
    }
}

/// Convert outcomes to scenario results with ids in the order given, starting at 1
pub fn scenarios_from_outcomes(
    outcomes: &[ScenarioOutcome],
    now: DateTime<Utc>,
) -> Vec<ScenarioResult> {
    outcomes
        .iter()
        .zip(1..)
        .map(|(outcome, id)| {
            if outcome.is_success() {
                ScenarioResult::synthesised(id, outcome.name.as_str(), now)
            } else {
                ScenarioResult::failed(
                    id,
                    outcome.name.as_str(),
                    outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                    now,
                )
            }
        })
        .collect()
}

/// An error type for [load_outcomes].
#[derive(Debug, thiserror::Error)]
pub enum OutcomeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load outcomes from a JSON array
pub fn load_outcomes<R: std::io::Read>(reader: R) -> Result<Vec<ScenarioOutcome>, OutcomeError> {
    let reader = std::io::BufReader::new(reader);
    Ok(serde_json::from_reader(reader)?)
}

/// Load outcomes from a JSON file containing an array of outcomes
pub fn load_outcomes_from_file<P>(path: P) -> Result<Vec<ScenarioOutcome>, OutcomeError>
where
    P: AsRef<std::path::Path>,
{
    let file = std::fs::File::open(path)?;
    load_outcomes(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_qa_report_model::ScenarioStatus;

    #[test]
    fn success_statuses() {
        let outcome = |status: &str| ScenarioOutcome {
            name: "A".to_string(),
            status: status.to_string(),
            error: None,
        };
        assert!(outcome("success").is_success());
        assert!(outcome("Passed").is_success());
        assert!(!outcome("failed").is_success());
        assert!(!outcome("skipped").is_success());
        assert!(!outcome("").is_success());
    }

    #[test]
    fn converts_outcomes_in_order() {
        let outcomes = vec![
            ScenarioOutcome {
                name: "Tab Navigation".to_string(),
                status: "success".to_string(),
                error: None,
            },
            ScenarioOutcome {
                name: "Dashboard Controls".to_string(),
                status: "error".to_string(),
                error: Some("selector .apply not found".to_string()),
            },
            ScenarioOutcome {
                name: "Data Export".to_string(),
                status: "failed".to_string(),
                error: None,
            },
        ];

        let scenarios = scenarios_from_outcomes(&outcomes, Utc::now());
        assert_eq!(vec![1, 2, 3], scenarios.iter().map(|s| s.id).collect::<Vec<_>>());
        assert_eq!(ScenarioStatus::Passed, scenarios[0].status);
        assert_eq!(None, scenarios[0].error);
        assert_eq!(ScenarioStatus::Failed, scenarios[1].status);
        assert_eq!(Some("selector .apply not found"), scenarios[1].error.as_deref());
        assert_eq!(Some(GENERIC_FAILURE), scenarios[2].error.as_deref());
    }

    #[test]
    fn loads_outcomes() -> anyhow::Result<()> {
        let json = r#"[
            {"name": "Tab Navigation", "status": "success"},
            {"name": "Dashboard Controls", "status": "failed", "error": "timeout"}
        ]"#;
        let outcomes = load_outcomes(json.as_bytes())?;
        assert_eq!(2, outcomes.len());
        assert_eq!(Some("timeout".to_string()), outcomes[1].error);
        Ok(())
    }

    #[test]
    fn fails_on_invalid_outcomes() {
        let result = load_outcomes("{not json".as_bytes());
        assert!(matches!(result, Err(OutcomeError::Serde(_))));

        let result = load_outcomes_from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(OutcomeError::Io(_))));
    }
}
