use chrono::Utc;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::calibration::interpolate_measurement;
use crate::config::Settings;
use crate::link::{LinkError, SensorLink};
use crate::measurement::Measurement;
use crate::sink::DeliverySink;

/// Drives the fixed-cadence sampling loop: one serial exchange per interval,
/// then calibration and delivery per sensor, then a drift-corrected sleep.
///
/// Protocol errors discard the cycle, delivery errors discard one sensor's
/// reading; both are logged and the loop keeps running. Only a failure to
/// open the link is fatal. Returns once `cancel` is triggered, with the link
/// closed on every exit path.
pub async fn run<L, S>(
    mut link: L,
    sink: &S,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<(), LinkError>
where
    L: SensorLink,
    S: DeliverySink,
{
    if let Err(err) = link.open() {
        link.close();
        return Err(err);
    }

    log::info!(
        "starting periodic reading of {} sensor(s) every {:?}",
        settings.sensor_count,
        settings.interval
    );

    while !cancel.is_cancelled() {
        let cycle_start = Instant::now();
        // timestamp_nanos_opt is None only for dates past the year 2262
        let timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);

        match link.read_voltages() {
            Ok(voltages) => {
                for (sensor_id, (&voltage, &measurement_range)) in voltages
                    .iter()
                    .zip(&settings.measurement_ranges)
                    .enumerate()
                {
                    let value = interpolate_measurement(
                        voltage,
                        settings.voltage_range,
                        measurement_range,
                    );
                    let measurement = Measurement {
                        value,
                        timestamp_ns,
                    };

                    if let Err(err) = sink.deliver(&measurement, sensor_id).await {
                        log::error!("delivery failed for sensor {sensor_id}: {err}");
                    }
                }
            }
            Err(err) => log::warn!("skipping cycle, sensor read failed: {err}"),
        }

        // Sleep only for what is left of the period, measured from the true
        // cycle start. An overrunning cycle rolls straight into the next one.
        let elapsed = cycle_start.elapsed();
        if let Some(remaining) = settings.interval.checked_sub(elapsed) {
            tokio::select! {
                _ = sleep(remaining) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    log::info!("interrupt observed, stopping periodic reading");
    link.close();

    Ok(())
}
