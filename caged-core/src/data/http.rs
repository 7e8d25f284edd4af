//! HTTP(S) mirror transport.
//!
//! Certificate validation is disabled, matching the FTPS transport, since
//! mirrors of the government server reuse its self-signed certificates.

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::io::Write;
use std::time::Duration;

use super::error::TransportError;
use super::transport::ArchiveTransport;

pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Tls(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Protocol(err.to_string())
        }
    }
}

impl ArchiveTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn retrieve(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(TransportError::Protocol(format!("HTTP {status} for {url}")));
        }

        response.copy_to(sink).map_err(|e| self.map_error(e))
    }
}
