use std::time::Duration;

use log::{debug, error};
use reqwest::blocking::Client;

use super::{HttpBody, HttpTransport};
use crate::errors::TransportError;

/// reqwest-backed blocking transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Client for short request/response round trips
    client: Client,
    /// Client for streamed downloads, without a whole-body deadline
    stream_client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout and a connect timeout for streams
    pub fn new(request_timeout: Duration, stream_connect_timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            stream_client: Client::builder()
                .connect_timeout(stream_connect_timeout)
                .timeout(None::<Duration>)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(15))
    }
}

fn map_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn post(&self, url: &str, headers: &[(&'static str, String)], body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        debug!("POST {} ({} bytes)", url, body.len());
        let response = request.body(body).send().map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Endpoint error ({}): {}", status, message);
            return Err(TransportError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TransportError::Body(e.to_string()))
    }

    fn get(&self, url: &str) -> Result<HttpBody, TransportError> {
        debug!("GET {}", url);
        let response = self.stream_client.get(url).send().map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status_code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        Ok(HttpBody {
            content_length: response.content_length(),
            reader: Box::new(response),
        })
    }
}
