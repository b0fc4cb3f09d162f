use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)running scenario:\s*(.+)").expect("valid start pattern"));

// Tried in order, the most specific form first
static COMPLETED: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)scenario\s+"([^"]*)"\s+completed successfully"#),
        Regex::new(r"(?i)scenario\s+(.+?)\s+completed successfully"),
        Regex::new(r"(?i)(.+?)\s+completed successfully"),
    ]
    .map(|r| r.expect("valid completed pattern"))
});

static FAILED: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)scenario\s+"([^"]*)"\s+failed(?::\s*(.*))?"#),
        Regex::new(r"(?i)scenario\s+(.+?)\s+failed(?::\s*(.*))?"),
    ]
    .map(|r| r.expect("valid failed pattern"))
});

static WARNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)warning:\s*(.+)").expect("valid warning pattern"));

/// The kind of line that was recognised in a log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Completed,
    Failed,
    Warning,
}

/// A scenario related line recognised in a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioEvent<'a> {
    pub kind: EventKind,
    /// The scenario label with surrounding whitespace and quotes removed.
    ///
    /// Empty for [EventKind::Warning], which is not tied to a named scenario.
    pub name: String,
    /// Failure reason or warning text
    pub detail: Option<String>,
    /// The source line the event was read from
    pub line: &'a str,
}

impl ScenarioEvent<'_> {
    /// Whether this event names a scenario
    pub fn is_named(&self) -> bool {
        self.kind != EventKind::Warning
    }
}

/// Lazily extract scenario events from a log, in line order.
///
/// Every line of the log is scanned and at most one event is produced per line. When a line
/// matches several patterns a start wins. Otherwise whichever of `completed successfully` and
/// `failed` follows the scenario name first decides the outcome. Warnings come last.
pub fn extract_events(log: &str) -> impl Iterator<Item = ScenarioEvent<'_>> + '_ {
    log.lines().filter_map(classify_line)
}

/// Recognise a single log line
pub fn classify_line(line: &str) -> Option<ScenarioEvent<'_>> {
    if let Some(caps) = START.captures(line) {
        return Some(ScenarioEvent {
            kind: EventKind::Start,
            name: clean_name(&caps[1]),
            detail: None,
            line,
        });
    }

    let completed = COMPLETED.iter().find_map(|r| r.captures(line));
    let failed = FAILED.iter().find_map(|r| r.captures(line));

    // The outcome keyword that comes first on the line wins, so text after `failed:` never
    // turns a failure into a completion
    match (completed, failed) {
        (Some(completed), Some(failed)) if name_end(&failed) < name_end(&completed) => {
            Some(failed_event(&failed, line))
        }
        (Some(completed), _) => Some(ScenarioEvent {
            kind: EventKind::Completed,
            name: clean_name(&completed[1]),
            detail: None,
            line,
        }),
        (None, Some(failed)) => Some(failed_event(&failed, line)),
        (None, None) => WARNING.captures(line).map(|caps| ScenarioEvent {
            kind: EventKind::Warning,
            name: String::new(),
            detail: Some(caps[1].trim().to_string()),
            line,
        }),
    }
}

fn failed_event<'a>(caps: &Captures<'_>, line: &'a str) -> ScenarioEvent<'a> {
    let detail = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    ScenarioEvent {
        kind: EventKind::Failed,
        name: clean_name(&caps[1]),
        detail,
        line,
    }
}

// The outcome keyword follows the name directly
fn name_end(caps: &Captures<'_>) -> usize {
    caps.get(1).map_or(usize::MAX, |m| m.end())
}

fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(log: &str) -> Vec<EventKind> {
        extract_events(log).map(|e| e.kind).collect()
    }

    #[test]
    fn recognises_start() {
        let event = classify_line("[INFO] Running scenario: Tab Navigation").unwrap();
        assert_eq!(EventKind::Start, event.kind);
        assert_eq!("Tab Navigation", event.name);
        assert!(event.is_named());
    }

    #[test]
    fn start_is_case_insensitive() {
        let event = classify_line("RUNNING SCENARIO: \"Data Export\"").unwrap();
        assert_eq!(EventKind::Start, event.kind);
        assert_eq!("Data Export", event.name);
    }

    #[test]
    fn recognises_completed_forms() {
        let quoted = classify_line(r#"Scenario "Tab Navigation" completed successfully"#).unwrap();
        assert_eq!(EventKind::Completed, quoted.kind);
        assert_eq!("Tab Navigation", quoted.name);

        let bare = classify_line("scenario Tab Navigation completed successfully").unwrap();
        assert_eq!(EventKind::Completed, bare.kind);
        assert_eq!("Tab Navigation", bare.name);

        let loose = classify_line("Tab Navigation completed successfully").unwrap();
        assert_eq!(EventKind::Completed, loose.kind);
        assert_eq!("Tab Navigation", loose.name);
    }

    #[test]
    fn recognises_failed_with_and_without_detail() {
        let with_detail =
            classify_line(r#"Scenario "Dashboard Controls" failed: timeout waiting for #apply"#)
                .unwrap();
        assert_eq!(EventKind::Failed, with_detail.kind);
        assert_eq!("Dashboard Controls", with_detail.name);
        assert_eq!(
            Some("timeout waiting for #apply".to_string()),
            with_detail.detail
        );

        let without_detail = classify_line("SCENARIO Dashboard Controls FAILED").unwrap();
        assert_eq!(EventKind::Failed, without_detail.kind);
        assert_eq!("Dashboard Controls", without_detail.name);
        assert_eq!(None, without_detail.detail);
    }

    #[test]
    fn recognises_warning() {
        let event = classify_line("Warning: chart took 2s to render").unwrap();
        assert_eq!(EventKind::Warning, event.kind);
        assert_eq!(Some("chart took 2s to render".to_string()), event.detail);
        assert!(!event.is_named());
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert!(classify_line("Navigating to http://localhost:3000").is_none());
        assert!(classify_line("").is_none());
    }

    #[test]
    fn scans_whole_log_in_line_order() {
        let log = "Running scenario: A\n\
                   Warning: slow\n\
                   Scenario \"A\" completed successfully\n\
                   noise\n\
                   Running scenario: B\n\
                   Scenario B failed: boom\n";
        assert_eq!(
            vec![
                EventKind::Start,
                EventKind::Warning,
                EventKind::Completed,
                EventKind::Start,
                EventKind::Failed,
            ],
            kinds(log)
        );
    }

    #[test]
    fn failure_detail_mentioning_completion_stays_failed() {
        let event = classify_line(
            r#"Scenario "Export" failed: login completed successfully but export button missing"#,
        )
        .unwrap();
        assert_eq!(EventKind::Failed, event.kind);
        assert_eq!("Export", event.name);
        assert_eq!(
            Some("login completed successfully but export button missing".to_string()),
            event.detail
        );

        let bare = classify_line("Scenario Export failed: step 2 completed successfully, step 3 did not")
            .unwrap();
        assert_eq!(EventKind::Failed, bare.kind);
        assert_eq!("Export", bare.name);
    }

    #[test]
    fn completion_mentioning_failures_stays_completed() {
        let event =
            classify_line("Scenario Export completed successfully, 0 checks failed").unwrap();
        assert_eq!(EventKind::Completed, event.kind);
        assert_eq!("Export", event.name);
        assert_eq!(None, event.detail);
    }

    #[test]
    fn extraction_is_restartable() {
        let log = "Running scenario: A\nScenario A completed successfully";
        let first: Vec<_> = extract_events(log).collect();
        let second: Vec<_> = extract_events(log).collect();
        assert_eq!(first, second);
    }
}
