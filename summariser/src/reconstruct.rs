use crate::event::{EventKind, ScenarioEvent};
use chrono::{DateTime, Utc};
use dashboard_qa_report_model::{ScenarioResult, ScenarioStatus, PLACEHOLDER_DURATION_MS};

/// Error recorded for a failed scenario when the log gave no reason
pub const GENERIC_FAILURE: &str = "Scenario failed";

/// Decides whether a completed or failed event belongs to the scenario that is currently open.
pub trait CorrelationStrategy {
    fn correlates(&self, open_name: &str, event: &ScenarioEvent<'_>) -> bool;
}

/// Accepts an event if either name contains the other, or if the source line mentions the open
/// scenario anywhere.
///
/// Known to be imprecise. Scenarios with overlapping names can be confused, and a completion
/// whose label drifted from the start label is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LooseCorrelation;

impl CorrelationStrategy for LooseCorrelation {
    fn correlates(&self, open_name: &str, event: &ScenarioEvent<'_>) -> bool {
        open_name.contains(event.name.as_str())
            || event.name.contains(open_name)
            || event.line.contains(open_name)
    }
}

/// Accepts an event only if its name equals the open scenario name, ignoring case.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactCorrelation;

impl CorrelationStrategy for ExactCorrelation {
    fn correlates(&self, open_name: &str, event: &ScenarioEvent<'_>) -> bool {
        open_name.to_lowercase() == event.name.to_lowercase()
    }
}

/// The scenarios recovered from a log
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Closed scenarios in discovery order
    pub scenarios: Vec<ScenarioResult>,
    /// The number of events that named a scenario, whether or not they were accepted
    pub named_events: usize,
    /// Completed or failed events that could not be matched to the open scenario
    pub dropped_events: usize,
    /// The id the next discovered scenario would be given
    pub next_id: u32,
}

/// Folds scenario events into [ScenarioResult]s.
///
/// At most one scenario is open at a time. Ids are assigned from a counter owned by the
/// reconstructor, so separate reconstructions never share state.
pub struct ScenarioReconstructor<C = LooseCorrelation> {
    correlation: C,
    now: DateTime<Utc>,
    next_id: u32,
    current: Option<ScenarioResult>,
    closed: Vec<ScenarioResult>,
    named_events: usize,
    dropped_events: usize,
}

impl ScenarioReconstructor<LooseCorrelation> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_correlation(LooseCorrelation, now)
    }
}

impl<C: CorrelationStrategy> ScenarioReconstructor<C> {
    pub fn with_correlation(correlation: C, now: DateTime<Utc>) -> Self {
        Self {
            correlation,
            now,
            next_id: 1,
            current: None,
            closed: Vec::new(),
            named_events: 0,
            dropped_events: 0,
        }
    }

    /// Apply all events and close any scenario left open at the end
    pub fn reconstruct<'a>(
        mut self,
        events: impl IntoIterator<Item = ScenarioEvent<'a>>,
    ) -> Reconstruction {
        for event in events {
            self.apply(event);
        }
        self.finish()
    }

    pub fn apply(&mut self, event: ScenarioEvent<'_>) {
        if event.is_named() {
            self.named_events += 1;
        }
        let now = self.now;

        match event.kind {
            EventKind::Start => {
                self.close_current();
                self.current = Some(ScenarioResult::running(self.next_id, event.name, now));
                self.next_id += 1;
            }
            EventKind::Completed => {
                if let Some(current) = self.correlated_current(&event) {
                    current.status = ScenarioStatus::Passed;
                    current.error = None;
                    current.end_time = now;
                    current.duration = PLACEHOLDER_DURATION_MS;
                }
            }
            EventKind::Failed => {
                if let Some(current) = self.correlated_current(&event) {
                    current.status = ScenarioStatus::Failed;
                    current.error =
                        Some(event.detail.unwrap_or_else(|| GENERIC_FAILURE.to_string()));
                    current.end_time = now;
                    current.duration = PLACEHOLDER_DURATION_MS;
                }
            }
            EventKind::Warning => {
                if let Some(current) = self.current.as_mut() {
                    current.warnings.push(event.detail.unwrap_or_default());
                    if current.status == ScenarioStatus::Running {
                        current.status = ScenarioStatus::Warning;
                    }
                }
            }
        }
    }

    pub fn finish(mut self) -> Reconstruction {
        self.close_current();
        Reconstruction {
            scenarios: self.closed,
            named_events: self.named_events,
            dropped_events: self.dropped_events,
            next_id: self.next_id,
        }
    }

    fn correlated_current(&mut self, event: &ScenarioEvent<'_>) -> Option<&mut ScenarioResult> {
        let current = self.current.as_mut()?;
        if self.correlation.correlates(&current.name, event) {
            Some(current)
        } else {
            log::trace!(
                "Dropping {:?} event for '{}', open scenario is '{}'",
                event.kind,
                event.name,
                current.name
            );
            self.dropped_events += 1;
            None
        }
    }

    // An open scenario without an outcome is assumed to have passed. This cannot tell a scenario
    // that finished without logging apart from one that hung until the log ended.
    fn close_current(&mut self) {
        if let Some(mut scenario) = self.current.take() {
            if scenario.status == ScenarioStatus::Running {
                scenario.status = ScenarioStatus::Passed;
                scenario.end_time = self.now;
            }
            self.closed.push(scenario);
        }
    }
}
