use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write as _};
use std::time::Duration;

/// Raw voltages from one polling cycle, index = sensor id.
pub type RawSample = Vec<f64>;

/// A request/response channel to the sensor hardware.
///
/// Two implementations exist: [`SerialLink`] for the real device and
/// [`SimulatedLink`] for running without hardware. The sampling loop only
/// depends on this trait.
pub trait SensorLink {
    /// Acquires the channel. Failure means there is nothing to poll and is
    /// fatal to the run.
    fn open(&mut self) -> Result<(), LinkError>;

    /// Releases the channel. Idempotent; safe to call when never opened.
    fn close(&mut self);

    /// Performs one request/response exchange and returns one voltage per
    /// configured sensor. Errors are recoverable: the caller skips the
    /// current cycle and keeps polling.
    fn read_voltages(&mut self) -> Result<RawSample, ProtocolError>;
}

/// Request byte understood by the ADC console firmware: `0` reads channel 0
/// only, `s` scans all channels. There is no "read channel i" command above
/// 0, so a multi-sensor deployment always scans.
fn request_token(sensor_count: usize) -> u8 {
    if sensor_count == 1 { b'0' } else { b's' }
}

/// Serial connection to the ADC console.
///
/// The device answers every request with one `\n`-terminated line of exactly
/// one comma-separated decimal voltage per sensor, in channel order.
pub struct SerialLink {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    sensor_count: usize,
    request: u8,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialLink {
    pub fn new(path: String, baud_rate: u32, timeout: Duration, sensor_count: usize) -> Self {
        Self {
            path,
            baud_rate,
            timeout,
            sensor_count,
            request: request_token(sensor_count),
            port: None,
        }
    }
}

impl SensorLink for SerialLink {
    fn open(&mut self) -> Result<(), LinkError> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(self.timeout)
            .open()
            .map_err(|source| LinkError {
                path: self.path.clone(),
                source,
            })?;

        self.port = Some(port);
        log::info!("serial port {} opened", self.path);

        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("serial port {} closed", self.path);
        }
    }

    fn read_voltages(&mut self) -> Result<RawSample, ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::LinkClosed)?;

        port.write_all(&[self.request])?;
        port.flush()?;

        let line = read_response_line(port.as_mut())?;
        log::debug!("sensor response: {line:?}");

        decode_response(&line, self.sensor_count)
    }
}

/// Reads up to the line terminator. A read timeout yields whatever arrived so
/// far, like the firmware side going silent mid-line; the decode step turns a
/// short or empty line into the matching [`ProtocolError`].
fn read_response_line(port: &mut dyn Read) -> Result<String, ProtocolError> {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                raw.push(byte[0]);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }

    String::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Splits one response line into exactly `sensor_count` voltages.
///
/// The field count is strict in both directions; a mismatch means the host
/// and firmware disagree about the deployment and the cycle is discarded.
fn decode_response(line: &str, sensor_count: usize) -> Result<RawSample, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != sensor_count {
        return Err(ProtocolError::FieldCount {
            expected: sensor_count,
            actual: fields.len(),
        });
    }

    fields
        .iter()
        .map(|field| {
            let field = field.trim();
            field
                .parse::<f64>()
                .map_err(|_| ProtocolError::InvalidNumber(field.to_string()))
        })
        .collect()
}

/// Deterministic stand-in for the hardware: each sensor emits a sine wave
/// whose period grows with the sensor index.
pub struct SimulatedLink {
    sensor_count: usize,
    tick: u64,
}

impl SimulatedLink {
    pub fn new(sensor_count: usize) -> Self {
        Self {
            sensor_count,
            tick: 0,
        }
    }
}

impl SensorLink for SimulatedLink {
    fn open(&mut self) -> Result<(), LinkError> {
        log::info!("simulated sensor link opened");
        Ok(())
    }

    fn close(&mut self) {
        log::info!("simulated sensor link closed");
    }

    fn read_voltages(&mut self) -> Result<RawSample, ProtocolError> {
        let tick = self.tick as f64;
        self.tick += 1;

        Ok((0..self.sensor_count)
            .map(|i| (tick / (i + 1) as f64).sin())
            .collect())
    }
}

/// The device could not be opened. Fatal: without a channel there is nothing
/// to poll.
#[derive(Debug)]
pub struct LinkError {
    pub path: String,
    pub source: serialport::Error,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to open serial port {}: {}", self.path, self.source)
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// One request/response exchange went wrong. Recoverable: the cycle is
/// skipped and polling continues.
#[derive(Debug)]
pub enum ProtocolError {
    LinkClosed,
    EmptyResponse,
    FieldCount { expected: usize, actual: usize },
    InvalidNumber(String),
    InvalidUtf8,
    Io(io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::LinkClosed => write!(f, "sensor link is not open"),
            ProtocolError::EmptyResponse => write!(f, "empty response from sensor"),
            ProtocolError::FieldCount { expected, actual } => {
                write!(f, "expected {expected} voltage field(s), got {actual}")
            }
            ProtocolError::InvalidNumber(field) => {
                write!(f, "invalid voltage field {field:?}")
            }
            ProtocolError::InvalidUtf8 => write!(f, "response is not valid UTF-8"),
            ProtocolError::Io(source) => write!(f, "serial I/O failed: {source}"),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProtocolError::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(source: io::Error) -> Self {
        ProtocolError::Io(source)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn single_sensor_requests_channel_zero() {
        assert_eq!(request_token(1), b'0');
    }

    #[test]
    fn multiple_sensors_request_a_scan() {
        assert_eq!(request_token(2), b's');
        assert_eq!(request_token(3), b's');
    }

    #[test]
    fn decodes_matching_field_count() {
        let voltages = decode_response("1.20,3.40", 2).unwrap();
        assert_eq!(voltages, vec![1.20, 3.40]);
    }

    #[test]
    fn decodes_single_field() {
        let voltages = decode_response("0.75", 1).unwrap();
        assert_eq!(voltages, vec![0.75]);
    }

    #[test]
    fn rejects_field_count_mismatch() {
        assert!(matches!(
            decode_response("1.20", 2),
            Err(ProtocolError::FieldCount {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            decode_response("1.20,3.40,5.60", 2),
            Err(ProtocolError::FieldCount {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn rejects_unparsable_field() {
        assert!(matches!(
            decode_response("abc,3.40", 2),
            Err(ProtocolError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_empty_response() {
        assert!(matches!(
            decode_response("", 2),
            Err(ProtocolError::EmptyResponse)
        ));
        assert!(matches!(
            decode_response("  \r", 2),
            Err(ProtocolError::EmptyResponse)
        ));
    }

    #[test]
    fn response_line_stops_at_terminator() {
        let mut stream = Cursor::new(b"1.20,3.40\n0.99\n".to_vec());
        let line = read_response_line(&mut stream).unwrap();
        assert_eq!(line, "1.20,3.40");
    }

    #[test]
    fn response_line_tolerates_carriage_return() {
        let mut stream = Cursor::new(b"0.50\r\n".to_vec());
        let line = read_response_line(&mut stream).unwrap();
        assert_eq!(decode_response(&line, 1).unwrap(), vec![0.50]);
    }

    #[test]
    fn response_line_rejects_invalid_utf8() {
        let mut stream = Cursor::new(vec![0xff, 0xfe, b'\n']);
        assert!(matches!(
            read_response_line(&mut stream),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn simulated_link_is_deterministic() {
        let mut first = SimulatedLink::new(2);
        let mut second = SimulatedLink::new(2);

        for _ in 0..5 {
            let a = first.read_voltages().unwrap();
            let b = second.read_voltages().unwrap();
            assert_eq!(a.len(), 2);
            assert_eq!(a, b);
        }
    }
}
