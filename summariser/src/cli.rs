use clap::Parser;
use dashboard_qa_report_model::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct SummariserCli {
    /// Path to the execution log of the test run.
    ///
    /// If the log is not given or cannot be read then a report of the default scenarios is produced.
    #[arg(long, env = "RUN_LOG_PATH")]
    pub log: Option<PathBuf>,

    /// Path to a JSON file with the scenario outcomes reported by the scenario runner.
    ///
    /// The file must contain an array of `{"name": .., "status": .., "error": ..}` objects. When
    /// given, scenarios are taken from this file and the log is only used for metrics.
    #[arg(long)]
    pub outcomes: Option<PathBuf>,

    /// The number of scenarios that were expected to run
    #[arg(long)]
    pub expected_total: Option<usize>,

    /// Initial load time measured by the runner, in milliseconds
    #[arg(long)]
    pub load_time_ms: Option<f64>,

    /// Average response time measured by the runner, in milliseconds
    #[arg(long)]
    pub average_response_time_ms: Option<f64>,

    /// The dashboard URL that was tested
    #[arg(long, env = "DASHBOARD_URL")]
    pub url: Option<String>,

    /// The user agent of the browser that ran the scenarios
    #[arg(long)]
    pub user_agent: Option<String>,

    /// The browser viewport in the format `WIDTHxHEIGHT`, for example `--viewport=1920x1080`
    #[arg(long, value_parser = parse_viewport)]
    pub viewport: Option<Viewport>,

    /// A screenshot taken during the run. Can be given multiple times.
    #[arg(long = "screenshot")]
    pub screenshots: Vec<String>,

    /// Directory to write reports to
    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,

    /// Only write the JSON report
    #[arg(long, default_value = "false")]
    pub minimal: bool,

    /// Logs shorter than this many characters are not trusted to describe the scenarios
    #[arg(long, default_value_t = dashboard_qa_summariser::reconcile::DEFAULT_MIN_LOG_LENGTH)]
    pub min_log_length: usize,
}

/// An error type for parsing run hints given on the command line
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HintError {
    #[error("Viewport must be in the format WIDTHxHEIGHT, got `{0}`")]
    ViewportFormat(String),
    #[error("Viewport dimension is not a positive number: `{0}`")]
    ViewportDimension(String),
}

pub fn parse_viewport(s: &str) -> Result<Viewport, HintError> {
    let (width, height) = s
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| HintError::ViewportFormat(s.to_string()))?;

    let dimension = |d: &str| {
        d.trim()
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| HintError::ViewportDimension(d.to_string()))
    };

    Ok(Viewport {
        width: dimension(width)?,
        height: dimension(height)?,
    })
}
