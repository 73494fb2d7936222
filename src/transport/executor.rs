//! Low-level request execution over a plain TCP socket.
//!
//! `TcpRequestExecutor` is the one place that actually sends bytes over the
//! network. It speaks HTTP/1.1 with `Connection: close` framing and records
//! every phase of the exchange (DNS lookup, connect, send, server busy,
//! receive) into the `SocketMonitor` it is handed. The `RequestExecutor`
//! trait is the injection seam the instrumentation decorates; tests substitute
//! their own implementations to exercise the interceptor without a network.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::configuration::WebDavConfig;
use crate::error_handling::types::TransportError;
use crate::instrumentation::socket_monitor::SocketMonitor;

use super::types::{HttpRequest, HttpResponse, Method};

/// The single "send this request, get this response" entry point.
///
/// Implementations must fully buffer the response body before returning.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &HttpRequest,
        monitor: &SocketMonitor,
    ) -> Result<HttpResponse, TransportError>;
}

/// Supplies addresses for a host so lookup duration is attributable per
/// attempt.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError>;
}

/// Default resolver backed by the system lookup.
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(TransportError::DnsError)?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::DnsError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for '{}'", host),
            )));
        }
        Ok(addrs)
    }
}

/// HTTP/1.1 executor over a fresh TCP connection per attempt.
pub struct TcpRequestExecutor {
    resolver: Arc<dyn DnsResolver>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl TcpRequestExecutor {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            resolver: Arc::new(SystemResolver),
            connect_timeout,
            request_timeout,
        }
    }

    pub fn from_config(config: &WebDavConfig) -> Self {
        Self::new(config.connect_timeout(), config.request_timeout())
    }

    /// Replaces the system resolver, e.g. with a caching or fake resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

#[async_trait]
impl RequestExecutor for TcpRequestExecutor {
    async fn execute(
        &self,
        request: &HttpRequest,
        monitor: &SocketMonitor,
    ) -> Result<HttpResponse, TransportError> {
        let lookup_started = Instant::now();
        let addrs = self.resolver.resolve(&request.host, request.port).await?;
        monitor.record_dns_lookup(lookup_started.elapsed());

        let connect_started = Instant::now();
        let mut stream = timeout(self.connect_timeout, connect_any(&addrs))
            .await
            .map_err(|_| TransportError::Timeout {
                phase: "connect",
                limit: self.connect_timeout,
            })??;
        monitor.record_connect(connect_started.elapsed());
        trace!("{} {} connected", request.method, request.url());

        let io = async {
            let head = build_head(request);
            let send_started = Instant::now();
            stream
                .write_all(head.as_bytes())
                .await
                .map_err(TransportError::IoError)?;
            if !request.body.is_empty() {
                stream
                    .write_all(&request.body)
                    .await
                    .map_err(TransportError::IoError)?;
            }
            stream.flush().await.map_err(TransportError::IoError)?;
            monitor.record_send(send_started.elapsed());
            monitor.add_bytes_sent((head.len() + request.body.len()) as u64);

            read_response(&mut stream, monitor).await
        };
        let raw = timeout(self.request_timeout, io)
            .await
            .map_err(|_| TransportError::Timeout {
                phase: "request",
                limit: self.request_timeout,
            })??;

        let response = parse_response(&raw)?;
        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url(),
            response.status,
            raw.len()
        );
        Ok(response)
    }
}

async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream, TransportError> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(TransportError::ConnectError(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to")
    })))
}

fn build_head(request: &HttpRequest) -> String {
    let mut head = String::with_capacity(256);
    head.push_str(request.method.as_str());
    head.push(' ');
    head.push_str(&request.path);
    head.push_str(" HTTP/1.1\r\n");
    if request.port == 80 {
        head.push_str(&format!("Host: {}\r\n", request.host));
    } else {
        head.push_str(&format!("Host: {}:{}\r\n", request.host, request.port));
    }
    head.push_str("Connection: close\r\n");
    if !request.body.is_empty() || request.method == Method::Put {
        head.push_str(&format!("Content-Length: {}\r\n", request.body.len()));
    }
    for (name, value) in &request.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    head
}

/// Reads the whole response until EOF, stamping the server-busy phase and the
/// first/last byte marks as data arrives.
async fn read_response(
    stream: &mut TcpStream,
    monitor: &SocketMonitor,
) -> Result<Vec<u8>, TransportError> {
    let mut raw = Vec::new();
    let mut buf = vec![0u8; 16 * 1024];
    let waiting = Instant::now();
    let mut first_byte: Option<Instant> = None;
    loop {
        let n = stream.read(&mut buf).await.map_err(TransportError::IoError)?;
        if n == 0 {
            break;
        }
        if first_byte.is_none() {
            first_byte = Some(Instant::now());
            monitor.record_server_busy(waiting.elapsed());
            monitor.mark_first_byte();
        }
        raw.extend_from_slice(&buf[..n]);
        monitor.add_bytes_received(n as u64);
    }
    match first_byte {
        Some(first) => {
            monitor.record_receive(first.elapsed());
            monitor.mark_last_byte();
            Ok(raw)
        }
        None => Err(TransportError::MalformedResponse(
            "server closed the connection without a response".to_string(),
        )),
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn malformed(what: &str) -> TransportError {
    TransportError::MalformedResponse(what.to_string())
}

fn parse_response(raw: &[u8]) -> Result<HttpResponse, TransportError> {
    let head_end =
        find_subslice(raw, b"\r\n\r\n").ok_or_else(|| malformed("missing header terminator"))?;
    let head = std::str::from_utf8(&raw[..head_end])
        .map_err(|_| malformed("header block is not valid UTF-8"))?;

    let mut lines = head.split("\r\n");
    let status_line = lines.next().ok_or_else(|| malformed("empty status line"))?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(malformed("status line does not start with HTTP version"));
    }
    let status: u16 = parts
        .next()
        .ok_or_else(|| malformed("status line has no status code"))?
        .parse()
        .map_err(|_| malformed("status code is not numeric"))?;

    let mut headers = Vec::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let mut body = raw[head_end + 4..].to_vec();
    let chunked = headers
        .iter()
        .any(|(k, v)| k == "transfer-encoding" && v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        body = decode_chunked(&body)?;
    } else if let Some(len) = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
    {
        if body.len() < len {
            return Err(malformed("body shorter than Content-Length"));
        }
        body.truncate(len);
    }

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn decode_chunked(data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let line_end =
            find_subslice(&data[pos..], b"\r\n").ok_or_else(|| malformed("truncated chunk size"))? + pos;
        let size_str = std::str::from_utf8(&data[pos..line_end])
            .map_err(|_| malformed("chunk size is not valid UTF-8"))?;
        // chunk extensions after ';' are ignored
        let size_str = size_str.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| malformed("chunk size is not hexadecimal"))?;
        pos = line_end + 2;
        if size == 0 {
            break;
        }
        if pos + size > data.len() {
            return Err(malformed("truncated chunk body"));
        }
        out.extend_from_slice(&data[pos..pos + size]);
        pos += size + 2; // skip the chunk's trailing CRLF
        if pos > data.len() {
            return Err(malformed("truncated chunk body"));
        }
    }
    Ok(out)
}
