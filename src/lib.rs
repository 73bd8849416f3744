//! console-bff - Backend-for-Frontend for the admin console
//!
//! Serves a health endpoint, gates everything else behind an optional
//! shared secret, and forwards `/bff/*` to the backend's `/api/public/*`
//! with a server-side `auth-token` when the browser sends none.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod proxy;
pub mod server;
