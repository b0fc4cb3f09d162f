use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser as _;
use dashboard_qa_summariser::generator::{
    render_summary, FullReportGenerator, MinimalReportGenerator, ReportGenerator,
};
use dashboard_qa_summariser::metrics::ExternalMetrics;
use dashboard_qa_summariser::outcome::load_outcomes;
use dashboard_qa_summariser::reconcile::ReconciliationPolicy;
use dashboard_qa_summariser::{decode_log, RunHints, Summariser};
use log::debug;

mod cli;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli::SummariserCli::parse();
    log::info!("{CRATE_NAME} {CRATE_VERSION}");

    let ignore_errors = std::env::var("IGNORE_REPORT_ERRORS").is_ok();
    let started_at = Utc::now();

    // An unreadable log is treated the same as no log at all
    let log_text = match &args.log {
        Some(path) => {
            debug!("Reading log from {}", path.display());
            match tokio::fs::read(path).await {
                Ok(bytes) => Some(decode_log(&bytes)),
                Err(e) => {
                    log::warn!("Could not read log {}: {e}", path.display());
                    None
                }
            }
        }
        None => None,
    };

    let outcomes = match &args.outcomes {
        Some(path) => {
            debug!("Reading scenario outcomes from {}", path.display());
            let content = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read outcomes from {}", path.display()))?;
            Some(load_outcomes(content.as_slice()).context("Failed to parse scenario outcomes")?)
        }
        None => None,
    };

    let hints = RunHints {
        declared_total: args.expected_total,
        metrics: ExternalMetrics {
            load_time: args.load_time_ms,
            average_response_time: args.average_response_time_ms,
            errors: Vec::new(),
        },
        url: args.url,
        user_agent: args.user_agent,
        viewport: args.viewport,
        started_at: Some(started_at),
        ended_at: None,
        screenshots: args.screenshots,
    };

    let summariser = Summariser::new().with_policy(
        ReconciliationPolicy::default().with_min_log_length(args.min_log_length),
    );
    let now = Utc::now();
    let report = match &outcomes {
        Some(outcomes) => summariser.summarise_outcomes(outcomes, log_text.as_deref(), hints, now),
        None => summariser.summarise_log(log_text.as_deref(), hints, now),
    };

    println!("{}", render_summary(&report));

    let generator: Box<dyn ReportGenerator> = if args.minimal {
        Box::new(MinimalReportGenerator)
    } else {
        Box::new(FullReportGenerator)
    };

    match generator.generate(&report, &args.output_dir) {
        Ok(paths) => {
            for path in paths {
                log::info!("Wrote {}", path.display());
            }
        }
        Err(e) => {
            let error_message = format!("Failed to write report: {e:?}");
            if ignore_errors {
                log::warn!("{}", error_message);
            } else {
                return Err(anyhow!(error_message));
            }
        }
    }

    Ok(())
}
