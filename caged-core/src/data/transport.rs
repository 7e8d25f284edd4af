//! Archive transport trait.
//!
//! A transport moves the bytes behind one remote URL into a writer. The
//! fetcher owns caching and atomic placement; transports know nothing
//! about the local cache, so they can be swapped or mocked in tests.

use reqwest::Url;
use std::io::Write;
use std::time::Duration;

use super::error::TransportError;
use super::ftp::FtpTransport;
use super::http::HttpTransport;

/// Something that can download a remote archive.
pub trait ArchiveTransport: Send + Sync {
    /// Human-readable name of this transport.
    fn name(&self) -> &str;

    /// Stream the file at `url` into `sink`, returning the number of bytes written.
    fn retrieve(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

/// Pick the transport matching the base URL's scheme.
///
/// `ftps` and `https` accept invalid certificates: the government host
/// serves self-signed ones.
pub fn transport_for(
    base_url: &Url,
    timeout: Duration,
) -> Result<Box<dyn ArchiveTransport>, TransportError> {
    match base_url.scheme() {
        "ftp" => Ok(Box::new(FtpTransport::plain(timeout))),
        "ftps" => Ok(Box::new(FtpTransport::explicit_tls(timeout))),
        "http" | "https" => Ok(Box::new(HttpTransport::new(timeout)?)),
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}
