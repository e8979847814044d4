use std::fmt;
use std::str::FromStr;

use crate::config::ConfigurationError;

/// An inclusive `min..max` span, used both for a sensor's electrical output
/// (volts) and for the physical quantity it measures.
///
/// `min < max` is established when the range is parsed from configuration and
/// is not re-checked afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigurationError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ConfigurationError::InvalidRange { min, max });
        }

        Ok(Self { min, max })
    }
}

impl FromStr for ValueRange {
    type Err = ConfigurationError;

    /// Parses `"<min>,<max>"`, e.g. `"0.0,5.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: Option<&str>| {
            part.and_then(|p| p.trim().parse::<f64>().ok())
                .ok_or_else(|| ConfigurationError::UnparsableRange(s.to_string()))
        };

        let mut parts = s.splitn(2, ',');
        let min = parse(parts.next())?;
        let max = parse(parts.next())?;

        ValueRange::new(min, max)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

/// Linearly interpolates a raw sensor voltage into a physical measurement.
///
/// The measurement range endpoints correspond to the voltage range endpoints;
/// voltages outside the voltage range extrapolate linearly rather than clamp,
/// so an out-of-range reading stays visible to the backend. Assumes a
/// non-degenerate voltage range, which configuration validation guarantees.
pub fn interpolate_measurement(
    voltage: f64,
    voltage_range: ValueRange,
    measurement_range: ValueRange,
) -> f64 {
    let slope =
        (measurement_range.max - measurement_range.min) / (voltage_range.max - voltage_range.min);

    (voltage - voltage_range.min) * slope + measurement_range.min
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f64, max: f64) -> ValueRange {
        ValueRange::new(min, max).unwrap()
    }

    #[test]
    fn midpoint_of_symmetric_ranges() {
        let measurement = interpolate_measurement(2.5, range(0.0, 5.0), range(0.0, 100.0));
        assert_eq!(measurement, 50.0);
    }

    #[test]
    fn exact_at_range_endpoints() {
        let voltage_range = range(0.5, 4.5);
        let measurement_range = range(-40.0, 120.0);

        assert_eq!(
            interpolate_measurement(voltage_range.min, voltage_range, measurement_range),
            measurement_range.min
        );
        assert_eq!(
            interpolate_measurement(voltage_range.max, voltage_range, measurement_range),
            measurement_range.max
        );
    }

    #[test]
    fn monotonic_in_voltage() {
        let voltage_range = range(1.0, 5.0);
        let measurement_range = range(0.0, 30.0);

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=100 {
            let voltage = step as f64 * 0.07;
            let measurement = interpolate_measurement(voltage, voltage_range, measurement_range);
            assert!(measurement >= previous);
            previous = measurement;
        }
    }

    #[test]
    fn extrapolates_outside_nominal_range() {
        let measurement = interpolate_measurement(6.0, range(0.0, 5.0), range(0.0, 100.0));
        assert_eq!(measurement, 120.0);

        let measurement = interpolate_measurement(-1.0, range(0.0, 5.0), range(0.0, 100.0));
        assert_eq!(measurement, -20.0);
    }

    #[test]
    fn parses_comma_separated_pair() {
        let parsed: ValueRange = "0.0,5.0".parse().unwrap();
        assert_eq!(parsed, range(0.0, 5.0));

        let parsed: ValueRange = " -10.5 , 10.5 ".parse().unwrap();
        assert_eq!(parsed, range(-10.5, 10.5));
    }

    #[test]
    fn rejects_malformed_or_degenerate_ranges() {
        assert!("5.0".parse::<ValueRange>().is_err());
        assert!("a,b".parse::<ValueRange>().is_err());
        assert!("5.0,5.0".parse::<ValueRange>().is_err());
        assert!("5.0,1.0".parse::<ValueRange>().is_err());
        assert!("NaN,1.0".parse::<ValueRange>().is_err());
    }
}
