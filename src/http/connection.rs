use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::GatewayError;
use crate::gateway::{Gateway, Route};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::{Method, Request};
use crate::http::writer::ResponseWriter;

pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: Vec<u8>,
    state: ConnectionState,
    gateway: Arc<Gateway>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, Exchange),
    Forwarding(Request, Exchange),
    Closed,
}

/// Per-request bookkeeping carried into the write phase.
pub struct Exchange {
    method: String,
    path: String,
    status: u16,
    keep_alive: bool,
    started: Instant,
}

enum ReadOutcome {
    Request(Request),
    Malformed(ParseError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, gateway: Arc<Gateway>) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(4096),
            state: ConnectionState::Reading,
            gateway,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match self.read_request().await? {
                    ReadOutcome::Request(req) => ConnectionState::Processing(req),
                    ReadOutcome::Malformed(e) => {
                        tracing::warn!(error = %e, "Rejecting malformed request");
                        let response = GatewayError::from(e).to_response();
                        let exchange = Exchange {
                            method: "-".to_string(),
                            path: "-".to_string(),
                            status: response.status.as_u16(),
                            keep_alive: false,
                            started: Instant::now(),
                        };
                        ConnectionState::Writing(ResponseWriter::new(&response), exchange)
                    }
                    ReadOutcome::Closed => ConnectionState::Closed,
                },

                ConnectionState::Processing(req) => {
                    let head_only = req.method == Method::HEAD;
                    let mut exchange = Exchange {
                        method: req.method.to_string(),
                        path: req.path().to_string(),
                        status: 0,
                        keep_alive: req.keep_alive(),
                        started: Instant::now(),
                    };

                    match self.gateway.route(req) {
                        Route::Local(response) => {
                            exchange.status = response.status.as_u16();
                            let writer = if head_only {
                                ResponseWriter::head_only(&response)
                            } else {
                                ResponseWriter::new(&response)
                            };
                            ConnectionState::Writing(writer, exchange)
                        }
                        Route::Forward(upstream_req) => {
                            ConnectionState::Forwarding(upstream_req, exchange)
                        }
                    }
                }

                ConnectionState::Writing(writer, exchange) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    exchange.log();
                    Self::next_state(exchange.keep_alive)
                }

                ConnectionState::Forwarding(req, mut exchange) => {
                    let delivery = self
                        .gateway
                        .proxy()
                        .forward(&req, &mut self.stream)
                        .await?;
                    exchange.status = delivery.status;
                    exchange.log();
                    Self::next_state(exchange.keep_alive && delivery.reusable)
                }

                ConnectionState::Closed => {
                    break;
                }
            };
        }

        Ok(())
    }

    fn next_state(keep_alive: bool) -> ConnectionState {
        if keep_alive {
            ConnectionState::Reading // go back for next request
        } else {
            ConnectionState::Closed
        }
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.drain(..consumed);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            let mut temp = [0u8; 4096];
            let idle_timeout = self.gateway.config().idle_timeout;
            let n = match timeout(idle_timeout, self.stream.read(&mut temp)).await {
                Ok(read) => read?,
                Err(_) => {
                    tracing::debug!(
                        idle_secs = idle_timeout.as_secs(),
                        buffered = self.buffer.len(),
                        "Closing idle client connection"
                    );
                    return Ok(ReadOutcome::Closed);
                }
            };

            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        buffered = self.buffer.len(),
                        "Client closed connection mid-request"
                    );
                }
                return Ok(ReadOutcome::Closed);
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }
}

impl Exchange {
    fn log(&self) {
        tracing::info!(
            method = %self.method,
            path = %self.path,
            status = self.status,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
}
