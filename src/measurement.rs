use serde::Serialize;

/// One calibrated reading as it goes over the wire to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,

    /// Nanoseconds since the Unix epoch. All sensors sampled in the same
    /// cycle share one timestamp.
    pub timestamp_ns: i64,
}
