use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use graphwatch::duration::{format_duration, parse_duration};
use graphwatch::types::{HealthReport, HealthVerdict, ResourceId};
use graphwatch::{
    Fleet, FleetOutcome, HttpFetcher, MonitorOutcome, PollError, ReportHistory, Settings,
};

const EXIT_HEALTHY: u8 = 0;
const EXIT_DEGRADED: u8 = 1;
const EXIT_FAILED: u8 = 2;
const EXIT_ERROR: u8 = 3;
const EXIT_TIMEOUT: u8 = 4;
const EXIT_CANCELLED: u8 = 130;

const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "graphwatch", version)]
#[command(about = "Health checks and readiness waits for graphmarts")]
struct Args {
    /// Settings file (TOML); GRAPHWATCH_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Management API endpoint (e.g., "https://anzo.example.com:8443")
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// API username
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// API password
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify each graphmart once.
    ///
    /// Exit status: 0 healthy, 1 degraded, 2 failed, 3 fetch error.
    Check {
        /// Graphmart URIs
        #[arg(required = true)]
        uris: Vec<String>,

        /// Write the reports to a JSON file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Wait until every graphmart is ready.
    ///
    /// Exit status: 0 ready and healthy, 1 ready but degraded, 2 failed,
    /// 3 fetch error, 4 timeout, 130 cancelled.
    Wait {
        /// Graphmart URIs
        #[arg(required = true)]
        uris: Vec<String>,

        /// Give up after this long (e.g., "20m")
        #[arg(short, long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Time between polls (e.g., "5s")
        #[arg(short, long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Consecutive fetch failures to tolerate
        #[arg(long)]
        failure_tolerance: Option<u32>,
    },

    /// Keep checking every graphmart on a fixed interval.
    ///
    /// Runs until --duration elapses or Ctrl-C. Exit status follows the
    /// last report per graphmart: 0 healthy, 1 degraded, 2 failed, 3 when a
    /// graphmart never produced a report.
    Watch {
        /// Graphmart URIs
        #[arg(required = true)]
        uris: Vec<String>,

        /// Time between checks (e.g., "60s")
        #[arg(short, long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Stop after this long (e.g., "1h"); unbounded when omitted
        #[arg(short, long, value_parser = parse_duration)]
        duration: Option<Duration>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.json_logs);

    let result = tokio::runtime::Runtime::new()
        .context("failed to start async runtime")
        .and_then(|rt| rt.block_on(run(args)));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: Args) -> Result<u8> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        settings.server.endpoint = endpoint;
    }
    if args.username.is_some() {
        settings.server.username = args.username;
    }
    if args.password.is_some() {
        settings.server.password = args.password;
    }

    match args.command {
        Command::Check { uris, export } => check(settings, uris, export.as_deref()).await,
        Command::Wait {
            uris,
            timeout,
            interval,
            failure_tolerance,
        } => {
            if let Some(timeout) = timeout {
                settings.poller.timeout = timeout;
            }
            if let Some(interval) = interval {
                settings.poller.poll_interval = interval;
            }
            if let Some(tolerance) = failure_tolerance {
                settings.poller.failure_tolerance = tolerance;
            }
            settings.validate()?;
            wait(settings, uris).await
        }
        Command::Watch {
            uris,
            interval,
            duration,
        } => {
            let interval = interval.unwrap_or(DEFAULT_WATCH_INTERVAL);
            if interval.is_zero() {
                anyhow::bail!("watch interval must be greater than zero");
            }
            watch(settings, uris, interval, duration).await
        }
    }
}

fn fleet(settings: &Settings) -> Result<Fleet<HttpFetcher>> {
    let client = settings
        .status_client()
        .context("failed to build API client")?;
    Ok(Fleet::new(
        Arc::new(HttpFetcher::new(client)),
        settings.classifier(),
        settings.poller.clone(),
    ))
}

async fn check(settings: Settings, uris: Vec<String>, export: Option<&Path>) -> Result<u8> {
    let fleet = fleet(&settings)?;
    let ids: Vec<ResourceId> = uris.into_iter().map(ResourceId::from).collect();
    let titles = fleet.titles(&ids).await;

    let mut code = EXIT_HEALTHY;
    let mut entries = Vec::new();
    for (id, result) in fleet.check_all(ids).await {
        let title = titles.get(&id);
        match result {
            Ok(report) => {
                println!("{}", labelled(report.to_string(), title));
                code = worst(code, verdict_code(report.verdict));
                entries.push(serde_json::json!({ "resource": id, "title": title, "report": report }));
            }
            Err(e) => {
                println!("[ERR] {}: {}", label(&id, &titles), e);
                code = worst(code, EXIT_ERROR);
                entries.push(
                    serde_json::json!({ "resource": id, "title": title, "error": e.to_string() }),
                );
            }
        }
    }

    if let Some(path) = export {
        export_reports(path, &entries)?;
        info!(path = %path.display(), "exported reports");
    }
    Ok(code)
}

fn export_reports(path: &Path, entries: &[serde_json::Value]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &serde_json::json!({ "resources": entries }))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

async fn wait(settings: Settings, uris: Vec<String>) -> Result<u8> {
    let cancel = cancel_on_ctrl_c("interrupted, cancelling waits");
    let fleet = fleet(&settings)?;
    let ids: Vec<ResourceId> = uris.into_iter().map(ResourceId::from).collect();
    let titles = fleet.titles(&ids).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(print_progress(rx, titles.clone()));

    info!(
        interval = %format_duration(settings.poller.poll_interval),
        timeout = %format_duration(settings.poller.timeout),
        "waiting for {} graphmart(s)",
        ids.len()
    );

    let fleet = fleet.with_cancellation(cancel).with_updates(tx);
    let outcomes = fleet.wait_all(ids).await;
    drop(fleet);
    finish_progress(progress).await;

    let mut code = EXIT_HEALTHY;
    for outcome in &outcomes {
        println!("{}", describe(outcome, &titles));
        code = worst(code, outcome_code(outcome));
    }
    Ok(code)
}

async fn watch(
    settings: Settings,
    uris: Vec<String>,
    interval: Duration,
    duration: Option<Duration>,
) -> Result<u8> {
    let cancel = cancel_on_ctrl_c("interrupted, stopping watch");
    let fleet = fleet(&settings)?;
    let ids: Vec<ResourceId> = uris.into_iter().map(ResourceId::from).collect();
    let titles = fleet.titles(&ids).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(print_progress(rx, titles.clone()));

    info!(
        interval = %format_duration(interval),
        duration = %duration.map(format_duration).unwrap_or_else(|| "until interrupted".to_string()),
        "watching {} graphmart(s)",
        ids.len()
    );

    let fleet = fleet.with_cancellation(cancel).with_updates(tx);
    let outcomes = fleet.monitor(ids, interval, duration).await;
    drop(fleet);
    finish_progress(progress).await;

    let mut code = EXIT_HEALTHY;
    for outcome in &outcomes {
        println!("{}", summarize_monitor(outcome, &titles));
        code = worst(code, monitor_code(outcome));
    }
    Ok(code)
}

fn cancel_on_ctrl_c(message: &'static str) -> CancellationToken {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("{}", message);
            ctrl_c.cancel();
        }
    });
    cancel
}

async fn finish_progress(progress: JoinHandle<()>) {
    if let Err(e) = progress.await {
        warn!(error = %e, "progress printer stopped early");
    }
}

// Prints a report whenever its assessment differs from the last one seen
async fn print_progress(
    mut rx: mpsc::UnboundedReceiver<HealthReport>,
    titles: HashMap<ResourceId, String>,
) {
    let mut history = ReportHistory::new();
    while let Some(report) = rx.recv().await {
        let changed = history
            .latest(&report.resource)
            .is_none_or(|last| !last.same_assessment(&report));
        if changed {
            println!("{}", labelled(report.to_string(), titles.get(&report.resource)));
        }
        if let Some(transition) = history.record(report) {
            if transition.is_regression() {
                warn!(from = %transition.from, to = %transition.to, "health regressed");
            }
        }
    }
}

fn label<'a>(id: &'a ResourceId, titles: &'a HashMap<ResourceId, String>) -> &'a str {
    titles.get(id).map_or(id.as_str(), String::as_str)
}

fn labelled(line: String, title: Option<&String>) -> String {
    match title {
        Some(title) => format!("{} \"{}\"", line, title),
        None => line,
    }
}

fn describe(outcome: &FleetOutcome, titles: &HashMap<ResourceId, String>) -> String {
    match &outcome.result {
        Ok(report) => format!("ready: {}", labelled(report.to_string(), titles.get(&outcome.resource))),
        Err(e) => format!("{}: {}", label(&outcome.resource, titles), e),
    }
}

fn summarize_monitor(outcome: &MonitorOutcome, titles: &HashMap<ResourceId, String>) -> String {
    let last = outcome
        .last_report
        .as_ref()
        .map_or_else(|| "no report".to_string(), |r| r.to_string());
    format!(
        "{}: {} check(s), {} fetch error(s), last: {}",
        label(&outcome.resource, titles),
        outcome.cycles,
        outcome.fetch_errors,
        last
    )
}

fn verdict_code(verdict: HealthVerdict) -> u8 {
    match verdict {
        HealthVerdict::Healthy => EXIT_HEALTHY,
        HealthVerdict::Degraded => EXIT_DEGRADED,
        HealthVerdict::Failed => EXIT_FAILED,
    }
}

fn outcome_code(outcome: &FleetOutcome) -> u8 {
    match &outcome.result {
        Ok(report) => verdict_code(report.verdict),
        Err(PollError::ResourceFailed { .. }) => EXIT_FAILED,
        Err(PollError::Fetch { .. }) => EXIT_ERROR,
        Err(PollError::TimeoutExceeded { .. }) => EXIT_TIMEOUT,
        Err(PollError::Cancelled { .. }) => EXIT_CANCELLED,
    }
}

fn monitor_code(outcome: &MonitorOutcome) -> u8 {
    outcome
        .last_report
        .as_ref()
        .map_or(EXIT_ERROR, |report| verdict_code(report.verdict))
}

// Exit codes are not ordered numerically by severity
fn worst(a: u8, b: u8) -> u8 {
    let rank = |code: u8| match code {
        EXIT_HEALTHY => 0,
        EXIT_DEGRADED => 1,
        EXIT_TIMEOUT => 2,
        EXIT_ERROR => 3,
        EXIT_FAILED => 4,
        _ => 5,
    };
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}
