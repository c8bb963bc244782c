use dotenv::dotenv;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use readiness_gate::logging;
use readiness_gate::readiness::HealthStatus;
use readiness_gate::{
    init_logging, DependencyGate, GateError, ReadinessCheck, ReadinessLatch, Settings,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => init_logging(),
    }
    info!("Readiness gate starting up");

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let probes = match settings.build_probes() {
        Ok(probes) => probes,
        Err(err) => {
            error!(error = %err, "Cannot build dependency probes");
            return ExitCode::FAILURE;
        }
    };

    if probes.is_empty() {
        warn!("No dependencies configured, nothing to wait for");
    }
    for probe in &settings.probes {
        info!(
            probe = probe.name(),
            kind = probe.kind(),
            target = probe.target(),
            "Registered dependency"
        );
    }

    let gate = DependencyGate::new(probes, ReadinessLatch::new(), settings.gate);
    let check = ReadinessCheck::new(gate.readiness());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let outcome = match gate.spawn(cancel).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "Dependency gate task failed");
            return ExitCode::FAILURE;
        }
    };

    let report = check.check();
    match report.to_json() {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "Cannot render health report"),
    }

    match outcome {
        Ok(()) if report.status == HealthStatus::Healthy => ExitCode::SUCCESS,
        Ok(()) => ExitCode::FAILURE,
        Err(GateError::Cancelled) => {
            info!("Stopped before dependencies became ready");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "Dependency gate stopped");
            ExitCode::FAILURE
        }
    }
}
