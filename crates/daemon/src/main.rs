// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule engine daemon (rulerund)
//!
//! Hosts a rule scheduler, logs its status periodically and applies config
//! changes on SIGHUP.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use clap::Parser;
use rulerun_daemon::{setup_logging, Args, DaemonConfig, EngineHost, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, config_path) = match DaemonConfig::resolve(args.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("rulerund: {}", e);
            std::process::exit(1);
        }
    };

    if args.check_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let log_guard = setup_logging(&config.log)?;

    let mut host = match EngineHost::start(config, config_path) {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to start engine: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut ticker = status_ticker(host.config().status.interval);

    info!("rulerund ready");
    // Signal ready for a supervising process
    println!("READY");

    loop {
        tokio::select! {
            _ = ticker.tick(), if host.config().status.enabled() => {
                host.log_status();
            }

            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration...");
                let previous = host.config().status.interval;
                match host.reload() {
                    Ok(_) if host.config().status.interval != previous => {
                        ticker = status_ticker(host.config().status.interval);
                    }
                    Ok(_) => {}
                    Err(e) => error!("Reload failed, keeping current configuration: {}", e),
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    // Joining worker threads blocks; keep it off the async runtime
    let stopped = tokio::task::spawn_blocking(move || host.shutdown()).await;
    if let Err(e) = stopped {
        error!("engine shutdown task failed: {}", e);
        return Err(LifecycleError::Shutdown(e.to_string()).into());
    }

    info!("rulerund stopped");
    drop(log_guard);
    Ok(())
}

/// Ticker for status logging; a zero period is replaced by a placeholder
/// and the tick branch stays disabled
fn status_ticker(period: Duration) -> Interval {
    let period = if period.is_zero() {
        Duration::from_secs(3600)
    } else {
        period
    };
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
