//! Response serialization.
//!
//! Gateway-generated responses and relayed backend heads go through the same
//! status-line and header encoder.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::HeaderMap;
use crate::http::response::Response;

/// Encodes a status line and header block, terminated by the blank line.
pub fn serialize_head(status: u16, reason: &str, headers: &HeaderMap) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    buf.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", status, reason).as_bytes());
    for (key, value) in headers.iter() {
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");

    buf
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = serialize_head(resp.status.as_u16(), resp.status.reason_phrase(), &resp.headers);
    buf.extend_from_slice(&resp.body);
    buf
}

/// A fully encoded response waiting to be written.
pub struct ResponseWriter {
    buffer: Vec<u8>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
        }
    }

    /// Encodes only the head. Used to answer HEAD requests; Content-Length
    /// still describes the body a GET would have carried.
    pub fn head_only(response: &Response) -> Self {
        Self {
            buffer: serialize_head(
                response.status.as_u16(),
                response.status.reason_phrase(),
                &response.headers,
            ),
        }
    }

    pub async fn write_to_stream<W>(&self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all(&self.buffer).await?;
        stream.flush().await?;
        Ok(())
    }
}
