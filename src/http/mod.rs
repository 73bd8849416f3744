//! HTTP protocol implementation.
//!
//! A small HTTP/1.1 server with keep-alive support, enough to sit in front of
//! a single backend.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request/response state machine
//! - **`headers`**: Case-insensitive header map
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: Locally generated responses with a builder
//! - **`writer`**: Serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (malformed → Writing 400, then Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Gateway decides: local answer or forward
//!        └──────┬───────────┘
//!               │
//!        ┌──────┴───────┐
//!        ▼              ▼
//!   ┌─────────┐   ┌────────────┐
//!   │ Writing │   │ Forwarding │ ← Stream backend response to client
//!   └────┬────┘   └─────┬──────┘
//!        └──────┬───────┘
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
