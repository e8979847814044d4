use clap::Parser;
use flow_telemetry::calibration::ValueRange;

#[derive(Debug, Parser)]
pub struct Args {
    /// Serial device the ADC console is attached to, e.g. /dev/ttyUSB0.
    #[arg(long, env = "SERIAL_PORT", required_unless_present = "simulate")]
    pub serial_port: Option<String>,

    #[arg(long, env = "SERIAL_BAUD_RATE", default_value_t = 192000)]
    pub serial_baud_rate: u32,

    /// Sampling period in seconds; also the serial read timeout and the
    /// backend request timeout.
    #[arg(long, env = "READ_INTERVAL_S", default_value_t = 1.0)]
    pub read_interval_s: f64,

    #[arg(long, env = "SENSOR_COUNT", default_value_t = 1)]
    pub sensor_count: usize,

    /// Electrical output span shared by all sensors, as <min>,<max> volts.
    #[arg(long, env = "VOLTAGE_RANGE")]
    pub voltage_range: ValueRange,

    /// Physical span of one sensor, as <min>,<max>; repeat the flag once per
    /// sensor (';'-separated in the environment variable).
    #[arg(
        long = "measurement-range",
        env = "MEASUREMENT_RANGES",
        value_delimiter = ';',
        required = true
    )]
    pub measurement_ranges: Vec<ValueRange>,

    #[arg(long, env = "BACKEND_SENSOR_URL")]
    pub backend_sensor_url: String,

    /// Poll a deterministic synthetic source instead of real hardware.
    #[arg(long)]
    pub simulate: bool,
}
