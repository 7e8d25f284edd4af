//! FTP / explicit-FTPS transport for the PDET microdata server.
//!
//! Anonymous login, passive mode, binary transfer. The FTPS variant upgrades
//! the control channel with `AUTH TLS` and accepts any certificate.
//!
//! The timeout is one deadline for the whole retrieval, measured from the
//! control connection. Each socket read is also bounded by it, so a stalled
//! server cannot hold a read open past the deadline by more than one read
//! timeout. The passive data connection itself is opened by `suppaftp`
//! without a connect timeout.

use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, NativeTlsConnector, NativeTlsFtpStream, Status};
use tracing::debug;

use super::error::TransportError;
use super::transport::ArchiveTransport;

const DEFAULT_FTP_PORT: u16 = 21;
const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous";

pub struct FtpTransport {
    timeout: Duration,
    secure: bool,
}

impl FtpTransport {
    pub fn plain(timeout: Duration) -> Self {
        Self {
            timeout,
            secure: false,
        }
    }

    pub fn explicit_tls(timeout: Duration) -> Self {
        Self {
            timeout,
            secure: true,
        }
    }

    fn socket_addr(url: &Url) -> Result<(String, SocketAddr), TransportError> {
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl(format!("{url} has no host")))?
            .to_string();
        let port = url.port().unwrap_or(DEFAULT_FTP_PORT);
        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("resolve {host}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::Connect(format!("{host} resolved to no address")))?;
        Ok((host, addr))
    }

    fn connect(&self, url: &Url) -> Result<NativeTlsFtpStream, TransportError> {
        let (host, addr) = Self::socket_addr(url)?;
        let stream = NativeTlsFtpStream::connect_timeout(addr, self.timeout)
            .map_err(|e| self.map_error(e, url))?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(TransportError::Io)?;

        if !self.secure {
            return Ok(stream);
        }

        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        stream
            .into_secure(NativeTlsConnector::from(connector), &host)
            .map_err(|e| self.map_error(e, url))
    }

    fn map_error(&self, err: FtpError, url: &Url) -> TransportError {
        match err {
            FtpError::ConnectionError(e) if is_timeout(&e) => TransportError::Timeout(self.timeout),
            FtpError::ConnectionError(e) => TransportError::Connect(e.to_string()),
            FtpError::SecureError(msg) => TransportError::Tls(msg),
            FtpError::UnexpectedResponse(resp) if resp.status == Status::FileUnavailable => {
                TransportError::NotFound(url.to_string())
            }
            other => TransportError::Protocol(other.to_string()),
        }
    }
}

impl ArchiveTransport for FtpTransport {
    fn name(&self) -> &str {
        if self.secure {
            "ftps"
        } else {
            "ftp"
        }
    }

    fn retrieve(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let remote_path = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?
            .into_owned();

        let deadline = Instant::now() + self.timeout;
        let mut ftp = self.connect(url)?;
        ftp.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
            .map_err(|e| self.map_error(e, url))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| self.map_error(e, url))?;

        debug!(path = %remote_path, secure = self.secure, "RETR");
        let mut data = ftp
            .retr_as_stream(&remote_path)
            .map_err(|e| self.map_error(e, url))?;
        data.get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(TransportError::Io)?;

        let mut reader = DeadlineReader::new(&mut data, deadline);
        let copied = io::copy(&mut reader, sink).map_err(|e| {
            if is_timeout(&e) {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Io(e)
            }
        })?;
        ftp.finalize_retr_stream(data)
            .map_err(|e| self.map_error(e, url))?;
        // The file is complete at this point; a failed QUIT is not worth failing over.
        let _ = ftp.quit();

        Ok(copied)
    }
}

/// Fails every read once `deadline` has passed.
struct DeadlineReader<R> {
    inner: R,
    deadline: Instant,
}

impl<R: Read> DeadlineReader<R> {
    fn new(inner: R, deadline: Instant) -> Self {
        Self { inner, deadline }
    }
}

impl<R: Read> Read for DeadlineReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if Instant::now() >= self.deadline {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "transfer deadline exceeded",
            ));
        }
        self.inner.read(buf)
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
