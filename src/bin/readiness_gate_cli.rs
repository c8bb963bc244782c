// src/bin/readiness_gate_cli.rs

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use readiness_gate::config::{parse_probe_list, ProbeConfig};
use readiness_gate::readiness::{DependencyGate, ReadinessCheck, ReadinessLatch};
use readiness_gate::{GateError, Settings};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "readiness_gate_cli",
    about = "Wait until every dependency answers, then exit"
)]
struct Opt {
    /// TCP dependency as `name=host:port` or `host:port` (repeatable)
    #[structopt(long, number_of_values = 1)]
    tcp: Vec<String>,

    /// HTTP dependency as `name=url` or `url`, expecting a 2xx (repeatable)
    #[structopt(long, number_of_values = 1)]
    http: Vec<String>,

    /// Redis dependency as `name=redis://...` (repeatable)
    #[structopt(long, number_of_values = 1)]
    redis: Vec<String>,

    /// JSON settings file; probes given on the command line are appended
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Only print errors, no spinner
    #[structopt(short, long)]
    quiet: bool,
}

impl Opt {
    fn has_probe_flags(&self) -> bool {
        !(self.tcp.is_empty() && self.http.is_empty() && self.redis.is_empty())
    }
}

fn init_tracing(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if opt.quiet {
        "error"
    } else {
        match opt.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "readiness_gate_cli={},readiness_gate={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_settings(opt: &Opt) -> readiness_gate::Result<Settings> {
    let mut settings = match &opt.config {
        Some(path) => Settings::from_file(path)?,
        None if opt.has_probe_flags() => Settings::default(),
        None => Settings::load()?,
    };

    for (kind, entries) in [("tcp", &opt.tcp), ("http", &opt.http), ("redis", &opt.redis)] {
        for entry in entries {
            settings.probes.extend(parse_probe_list(kind, entry)?);
        }
    }

    settings.validate()?;
    Ok(settings)
}

fn print_probes(probes: &[ProbeConfig]) {
    let mut table = Table::new();
    table.set_titles(row!["#", "Probe", "Kind", "Target", "Timeout"]);
    for (i, probe) in probes.iter().enumerate() {
        let timeout = match probe {
            ProbeConfig::Tcp { timeout, .. }
            | ProbeConfig::Http { timeout, .. }
            | ProbeConfig::Redis { timeout, .. } => timeout,
        };
        table.add_row(row![
            i + 1,
            probe.name(),
            probe.kind(),
            probe.target(),
            format!("{:?}", timeout)
        ]);
    }
    table.printstd();
}

fn spinner(probe_count: usize) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(format!("Waiting for {} dependencies", probe_count));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[tokio::main]
async fn main() -> ExitCode {
    let opt = Opt::from_args();

    if let Err(err) = init_tracing(&opt) {
        eprintln!("Failed to set tracing subscriber: {}", err);
        return ExitCode::FAILURE;
    }

    match run(&opt).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the dependencies became ready.
async fn run(opt: &Opt) -> Result<bool, Box<dyn std::error::Error>> {
    let settings = load_settings(opt)?;
    let probes = settings.build_probes()?;

    if !opt.quiet {
        print_probes(&settings.probes);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || interrupt.cancel())?;

    let gate = DependencyGate::new(probes, ReadinessLatch::new(), settings.gate);
    let check = ReadinessCheck::named("cli", gate.readiness());
    info!(probes = gate.probe_count(), "Starting dependency gate");

    let bar = (!opt.quiet).then(|| spinner(gate.probe_count()));
    let started = Instant::now();
    let outcome = gate.spawn(cancel).await?;
    let elapsed = started.elapsed();

    match outcome {
        Ok(()) => {
            if let Some(bar) = bar {
                bar.finish_with_message(format!("All dependencies ready in {:.1?}", elapsed));
            }
            Ok(check.check().is_healthy())
        }
        Err(GateError::Cancelled) => {
            if let Some(bar) = bar {
                bar.abandon_with_message("Interrupted before dependencies were ready");
            }
            Ok(false)
        }
        Err(err) => {
            if let Some(bar) = bar {
                bar.abandon_with_message("Dependency gate failed");
            }
            Err(err.into())
        }
    }
}
