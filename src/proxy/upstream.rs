//! Upstream connection and request forwarding
//!
//! This module connects to the backend, forwards one request per connection
//! and streams the backend response straight back to the client.

use anyhow::{Context, Result};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::{Host, Url};

use crate::error::GatewayError;
use crate::http::headers::HeaderMap;
use crate::http::parser::{MAX_HEADER_BYTES, find_headers_end};
use crate::http::request::{Method, Request};
use crate::http::writer::{ResponseWriter, serialize_head};

/// Default buffer size for upstream reads
const BUFFER_SIZE: usize = 8192;

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: [&str; 6] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Connection",
    "Upgrade",
    "TE",
    "Trailer",
];

/// Status line and headers of a backend response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// 1xx heads that precede the final response. 101 ends the exchange
    /// instead.
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }
}

/// How the backend delimits its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Empty,
    Length(u64),
    Chunked,
    UntilClose,
}

impl BodyFraming {
    pub fn for_response(head: &ResponseHead, request_method: &Method) -> Self {
        if *request_method == Method::HEAD
            || (100..200).contains(&head.status)
            || head.status == 204
            || head.status == 304
        {
            return BodyFraming::Empty;
        }

        if head
            .headers
            .get("Transfer-Encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
        {
            return BodyFraming::Chunked;
        }

        match head
            .headers
            .get("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(0) => BodyFraming::Empty,
            Some(n) => BodyFraming::Length(n),
            None => BodyFraming::UntilClose,
        }
    }

    /// Whether the client can tell where the body ends without a close.
    pub fn is_self_delimiting(self) -> bool {
        self != BodyFraming::UntilClose
    }
}

/// Outcome of a forwarded request as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Status sent to the client, relayed or gateway-generated
    pub status: u16,
    /// Whether the client connection may carry another request
    pub reusable: bool,
}

struct Upstream {
    stream: TcpStream,
    /// 1xx heads received before `head`, in arrival order
    interim: Vec<ResponseHead>,
    head: ResponseHead,
    /// Body bytes read together with the head
    leftover: BytesMut,
}

/// Forwards requests to the configured backend
pub struct ProxyHandler {
    /// Backend base URL
    backend: Url,

    /// Connection timeout duration
    connection_timeout: Duration,

    /// Time allowed for sending the request and receiving the response head
    request_timeout: Duration,
}

impl ProxyHandler {
    /// Create a new proxy handler
    pub fn new(backend: Url, connection_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            backend,
            connection_timeout,
            request_timeout,
        }
    }

    pub fn backend(&self) -> &Url {
        &self.backend
    }

    /// Forward `request` to the backend and stream the response to `client`.
    ///
    /// Failures before anything reached the client are answered with a JSON
    /// 502/504 and are not an `Err`. An `Err` means the client connection is
    /// in an unknown state and must be dropped.
    pub async fn forward<W>(&self, request: &Request, client: &mut W) -> Result<Delivery>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(
            backend = %self.backend,
            method = %request.method,
            target = %request.target,
            "Forwarding request to backend"
        );

        match self.open_upstream(request).await {
            Ok(upstream) => {
                let status = upstream.head.status;
                let reusable = self
                    .relay(upstream, request, client)
                    .await
                    .with_context(|| format!("relaying backend response for {}", request.target))?;
                Ok(Delivery { status, reusable })
            }
            Err(e) => {
                tracing::warn!(
                    backend = %self.backend,
                    error = %e,
                    method = %request.method,
                    target = %request.target,
                    "Failed to proxy request to backend"
                );

                let response = e.to_response();
                let writer = if request.method == Method::HEAD {
                    ResponseWriter::head_only(&response)
                } else {
                    ResponseWriter::new(&response)
                };
                writer.write_to_stream(client).await?;
                Ok(Delivery {
                    status: response.status.as_u16(),
                    reusable: true,
                })
            }
        }
    }

    async fn open_upstream(&self, request: &Request) -> Result<Upstream, GatewayError> {
        if self.backend.scheme() != "http" {
            return Err(GatewayError::UnsupportedScheme(self.backend.scheme().to_string()));
        }

        let port = self.backend.port_or_known_default().unwrap_or(80);
        let host = match self.backend.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(GatewayError::UpstreamConnect(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "backend URL has no host",
                )));
            }
        };

        // Connect to backend with timeout
        let mut stream = timeout(self.connection_timeout, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| GatewayError::UpstreamTimeout)?
            .map_err(GatewayError::UpstreamConnect)?;

        tracing::trace!(backend = %self.backend, "Connected to backend");

        let request_bytes = self.build_http_request(request);

        let (interim, head, leftover) = timeout(
            self.request_timeout,
            send_and_read_head(&mut stream, &request_bytes),
        )
        .await
        .map_err(|_| GatewayError::UpstreamTimeout)??;

        Ok(Upstream {
            stream,
            interim,
            head,
            leftover,
        })
    }

    /// Build HTTP request bytes to send to backend
    ///
    /// `request.target` must already be the backend target.
    pub fn build_http_request(&self, request: &Request) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(256 + request.body.len());

        let target = if request.target.is_empty() {
            "/"
        } else {
            &request.target
        };

        buffer.extend_from_slice(format!("{} {} HTTP/1.1\r\n", request.method, target).as_bytes());

        let mut headers = request.headers.clone();

        // Headers named in Connection are hop-by-hop too
        let listed: Vec<String> = headers
            .get_all("Connection")
            .flat_map(|v| v.split(','))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        for name in listed.iter().map(String::as_str).chain(HOP_BY_HOP) {
            headers.remove(name);
        }
        headers.remove("Transfer-Encoding");
        // The body is already buffered, so there is nothing to continue
        headers.remove("Expect");

        if let Some(host) = self.backend.host_str() {
            let host_value = match self.backend.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            headers.insert("Host", host_value);
        }

        if !request.body.is_empty() || headers.contains("Content-Length") {
            headers.insert("Content-Length", request.body.len().to_string());
        }

        // One request per upstream connection
        headers.insert("Connection", "close");

        for (key, value) in headers.iter() {
            buffer.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }

        buffer.extend_from_slice(b"\r\n");
        buffer.extend_from_slice(&request.body);

        buffer
    }

    /// Writes the response head and streams the body to the client.
    ///
    /// Returns whether the client connection can be reused.
    async fn relay<W>(&self, upstream: Upstream, request: &Request, client: &mut W) -> Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        let Upstream {
            mut stream,
            interim,
            mut head,
            leftover,
        } = upstream;

        // 100 Continue answered an Expect the gateway already consumed, and
        // HTTP/1.0 clients cannot take 1xx at all.
        let relay_interim = !request.version.eq_ignore_ascii_case("HTTP/1.0");
        for mut early in interim {
            if early.status == 100 || !relay_interim {
                continue;
            }
            strip_hop_by_hop(&mut early.headers);
            client
                .write_all(&serialize_head(early.status, &early.reason, &early.headers))
                .await?;
        }

        let framing = BodyFraming::for_response(&head, &request.method);

        strip_hop_by_hop(&mut head.headers);
        if !framing.is_self_delimiting() {
            head.headers.insert("Connection", "close");
        }

        client
            .write_all(&serialize_head(head.status, &head.reason, &head.headers))
            .await?;

        match framing {
            BodyFraming::Empty => {}
            BodyFraming::Length(length) => {
                let buffered = (leftover.len() as u64).min(length);
                client.write_all(&leftover[..buffered as usize]).await?;

                let remaining = length - buffered;
                let copied = tokio::io::copy(&mut (&mut stream).take(remaining), client).await?;
                if copied < remaining {
                    anyhow::bail!(
                        "backend closed after {} of {} body bytes",
                        buffered + copied,
                        length
                    );
                }
            }
            BodyFraming::Chunked | BodyFraming::UntilClose => {
                client.write_all(&leftover).await?;
                tokio::io::copy(&mut stream, client).await?;
            }
        }

        client.flush().await?;

        tracing::trace!(status = head.status, ?framing, "Backend response relayed");

        Ok(framing.is_self_delimiting())
    }
}

/// Sends the request and reads heads until the final one.
///
/// Returns the interim heads, the final head and the body bytes read so far.
async fn send_and_read_head(
    stream: &mut TcpStream,
    request_bytes: &[u8],
) -> Result<(Vec<ResponseHead>, ResponseHead, BytesMut), GatewayError> {
    stream
        .write_all(request_bytes)
        .await
        .map_err(GatewayError::UpstreamConnect)?;
    stream.flush().await.map_err(GatewayError::UpstreamConnect)?;

    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
    let mut interim = Vec::new();
    loop {
        let head = read_response_head(stream, &mut buffer).await?;
        if !head.is_interim() {
            return Ok((interim, head, buffer));
        }
        tracing::trace!(status = head.status, "Interim backend response");
        interim.push(head);
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Reads until the end of the next response head.
///
/// Bytes already in `buffer` are parsed first. On return `buffer` holds
/// whatever followed the head.
async fn read_response_head<R>(stream: &mut R, buffer: &mut BytesMut) -> Result<ResponseHead, GatewayError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(headers_end) = find_headers_end(buffer) {
            let head_bytes = buffer.split_to(headers_end + 4);
            return parse_response_head(&head_bytes);
        }

        let n = stream
            .read_buf(buffer)
            .await
            .map_err(GatewayError::UpstreamConnect)?;

        if n == 0 {
            return Err(GatewayError::InvalidUpstreamResponse(
                "connection closed before complete response head".to_string(),
            ));
        }

        // Prevent unbounded header growth
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(GatewayError::InvalidUpstreamResponse(
                "response headers too large".to_string(),
            ));
        }
    }
}

/// Parse a response status line and headers.
pub fn parse_response_head(head_bytes: &[u8]) -> Result<ResponseHead, GatewayError> {
    let invalid = |msg: String| GatewayError::InvalidUpstreamResponse(msg);

    let head_str = std::str::from_utf8(head_bytes)
        .map_err(|_| invalid("invalid UTF-8 in response headers".to_string()))?;

    let mut lines = head_str.split("\r\n");

    let status_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| invalid("empty response".to_string()))?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(invalid(format!("invalid status line: {}", status_line)));
    }

    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..1000).contains(code))
        .ok_or_else(|| invalid(format!("invalid status line: {}", status_line)))?;

    let reason = parts.next().unwrap_or_default().to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.append(key.trim(), value.trim());
        }
    }

    Ok(ResponseHead {
        version: version.to_string(),
        status,
        reason,
        headers,
    })
}
