use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::calibration::ValueRange;

/// Validated sampling configuration, consumed read-only by the sampling loop.
///
/// All invariants (positive interval, at least one sensor, one measurement
/// range per sensor, non-degenerate ranges) are established here, before the
/// loop is constructed, and are never re-checked at runtime.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Target period of one sampling cycle. Also used as the serial read
    /// timeout and the HTTP request timeout.
    pub interval: Duration,
    pub sensor_count: usize,
    /// Electrical output span shared by all sensors.
    pub voltage_range: ValueRange,
    /// Physical measurement span per sensor, index = sensor id.
    pub measurement_ranges: Vec<ValueRange>,
}

impl Settings {
    pub fn new(
        interval_s: f64,
        sensor_count: usize,
        voltage_range: ValueRange,
        measurement_ranges: Vec<ValueRange>,
    ) -> Result<Self, ConfigurationError> {
        if !interval_s.is_finite() || interval_s <= 0.0 {
            return Err(ConfigurationError::InvalidInterval(interval_s));
        }

        if sensor_count == 0 {
            return Err(ConfigurationError::NoSensors);
        }

        if measurement_ranges.len() != sensor_count {
            return Err(ConfigurationError::MeasurementRangeCount {
                expected: sensor_count,
                actual: measurement_ranges.len(),
            });
        }

        Ok(Self {
            interval: Duration::from_secs_f64(interval_s),
            sensor_count,
            voltage_range,
            measurement_ranges,
        })
    }
}

#[derive(Debug)]
pub enum ConfigurationError {
    InvalidRange { min: f64, max: f64 },
    UnparsableRange(String),
    InvalidInterval(f64),
    NoSensors,
    MeasurementRangeCount { expected: usize, actual: usize },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::InvalidRange { min, max } => {
                write!(f, "range must satisfy min < max, got {min},{max}")
            }
            ConfigurationError::UnparsableRange(input) => {
                write!(f, "expected a range of the form <min>,<max>, got {input:?}")
            }
            ConfigurationError::InvalidInterval(interval_s) => {
                write!(f, "read interval must be positive, got {interval_s}")
            }
            ConfigurationError::NoSensors => {
                write!(f, "sensor count must be at least 1")
            }
            ConfigurationError::MeasurementRangeCount { expected, actual } => {
                write!(
                    f,
                    "expected {expected} measurement range(s) for {expected} sensor(s), got {actual}"
                )
            }
        }
    }
}

impl Error for ConfigurationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f64, max: f64) -> ValueRange {
        ValueRange::new(min, max).unwrap()
    }

    #[test]
    fn accepts_one_range_per_sensor() {
        let settings = Settings::new(
            1.0,
            2,
            range(0.0, 5.0),
            vec![range(0.0, 100.0), range(0.0, 60.0)],
        )
        .unwrap();

        assert_eq!(settings.interval, Duration::from_secs(1));
        assert_eq!(settings.sensor_count, 2);
        assert_eq!(settings.measurement_ranges.len(), 2);
    }

    #[test]
    fn rejects_measurement_range_count_mismatch() {
        let result = Settings::new(1.0, 2, range(0.0, 5.0), vec![range(0.0, 100.0)]);

        assert!(matches!(
            result,
            Err(ConfigurationError::MeasurementRangeCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn rejects_zero_sensors() {
        let result = Settings::new(1.0, 0, range(0.0, 5.0), vec![]);
        assert!(matches!(result, Err(ConfigurationError::NoSensors)));
    }

    #[test]
    fn rejects_non_positive_interval() {
        for interval_s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = Settings::new(interval_s, 1, range(0.0, 5.0), vec![range(0.0, 100.0)]);
            assert!(matches!(result, Err(ConfigurationError::InvalidInterval(_))));
        }
    }
}
