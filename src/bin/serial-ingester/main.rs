mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use flow_telemetry::config::Settings;
use flow_telemetry::link::{SerialLink, SimulatedLink};
use flow_telemetry::sampler;
use flow_telemetry::sink::HttpDeliverySink;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::new(
        args.read_interval_s,
        args.sensor_count,
        args.voltage_range,
        args.measurement_ranges.clone(),
    )
    .context("invalid sampling configuration")?;

    let sink = HttpDeliverySink::new(&args.backend_sensor_url, settings.interval)
        .context("failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, stopping");
            signal_cancel.cancel();
        }
    });

    if args.simulate {
        let link = SimulatedLink::new(settings.sensor_count);
        sampler::run(link, &sink, &settings, cancel)
            .await
            .context("sampling loop failed")?;
    } else {
        let serial_port = args
            .serial_port
            .context("--serial-port is required unless --simulate is set")?;
        let link = SerialLink::new(
            serial_port,
            args.serial_baud_rate,
            settings.interval,
            settings.sensor_count,
        );
        sampler::run(link, &sink, &settings, cancel)
            .await
            .context("sampling loop failed")?;
    }

    Ok(())
}
