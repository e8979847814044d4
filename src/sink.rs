use std::error::Error;
use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;

use crate::measurement::Measurement;

/// Receives one measurement for one sensor and reports whether the backend
/// accepted it. Failures are per sensor and per cycle; the sampling loop
/// absorbs them and moves on.
#[allow(async_fn_in_trait)]
pub trait DeliverySink {
    async fn deliver(
        &self,
        measurement: &Measurement,
        sensor_id: usize,
    ) -> Result<(), DeliveryError>;
}

/// Posts measurements as JSON to the backend's per-sensor reading endpoint.
pub struct HttpDeliverySink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeliverySink {
    /// The timeout applies to the whole request and should equal the sampling
    /// interval so a stalled backend cannot block more than one cycle.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn reading_url(&self, sensor_id: usize) -> String {
        format!("{}/v1/sensors/flowmeters/{sensor_id}/reading", self.base_url)
    }
}

impl DeliverySink for HttpDeliverySink {
    async fn deliver(
        &self,
        measurement: &Measurement,
        sensor_id: usize,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.reading_url(sensor_id))
            .header(ACCEPT, "application/json")
            .json(measurement)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected { status });
        }

        log::debug!("delivered measurement for sensor {sensor_id}");

        Ok(())
    }
}

/// One measurement could not be handed to the backend. Recoverable: no retry,
/// no buffering, the reading is dropped.
#[derive(Debug)]
pub enum DeliveryError {
    Transport(reqwest::Error),
    Rejected { status: StatusCode },
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Transport(source) => write!(f, "request failed: {source}"),
            DeliveryError::Rejected { status } => {
                write!(f, "backend rejected measurement: HTTP {status}")
            }
        }
    }
}

impl Error for DeliveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DeliveryError::Transport(source) => Some(source),
            DeliveryError::Rejected { .. } => None,
        }
    }
}
