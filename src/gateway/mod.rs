//! Request routing for the BFF.
//!
//! Every parsed request goes through [`Gateway::route`], which either answers
//! locally or hands back a request ready for the backend:
//!
//! ```text
//!   GET|HEAD /health ──────────────────────────► 200 {ok, backend}
//!        │ (anything else)
//!        ▼
//!   dev auth gate ── reject ───────────────────► 401 {error, message}
//!        │
//!        ├─ GET|HEAD /bff/dev-auth-status ─────► 200 {ok}
//!        ├─ dot segment in path ───────────────► 400 {error, message}
//!        ├─ /bff, /bff/* ── inject auth-token,
//!        │                  rewrite to /api/public/* ──► Forward
//!        └─ other ─────────────────────────────► 404 {error, message}
//! ```

pub mod credentials;
pub mod gate;
pub mod rewrite;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::proxy::ProxyHandler;

pub use credentials::{CREDENTIAL_HEADER, Injection, inject_credential};
pub use gate::{Gate, GateOutcome};
pub use rewrite::{BACKEND_SEGMENT, FORWARD_PREFIX, backend_target, has_dot_segment};

/// Liveness endpoint. Never gated, never touches the backend.
pub const HEALTH_PATH: &str = "/health";

/// Lets the UI find out whether the gate currently blocks it.
pub const STATUS_PROBE_PATH: &str = "/bff/dev-auth-status";

/// What to do with a request.
#[derive(Debug)]
pub enum Route {
    /// Answer directly with this response.
    Local(Response),
    /// Forward this (already rewritten) request to the backend.
    Forward(Request),
}

#[derive(Debug, Serialize)]
struct HealthReport<'a> {
    ok: bool,
    backend: &'a str,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    ok: bool,
}

pub struct Gateway {
    config: Arc<Config>,
    gate: Gate,
    proxy: ProxyHandler,
}

impl Gateway {
    pub fn new(config: Arc<Config>) -> Self {
        let gate = Gate::from_config(&config);

        if gate.is_enabled() {
            info!(header = gate.header_name(), "Dev auth gate enabled");
        } else {
            warn!("BFF_DEV_AUTH_TOKEN is empty, dev auth gate is DISABLED and all routes are open");
        }

        if config.backend_api_token.is_empty() {
            info!("BACKEND_API_TOKEN is empty, no server-side {} will be injected", CREDENTIAL_HEADER);
        }

        let proxy = ProxyHandler::new(
            config.backend_url.clone(),
            config.connect_timeout,
            config.upstream_timeout,
        );

        Self {
            config,
            gate,
            proxy,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn proxy(&self) -> &ProxyHandler {
        &self.proxy
    }

    /// Decides how `request` is answered.
    pub fn route(&self, mut request: Request) -> Route {
        let read_only = matches!(request.method, Method::GET | Method::HEAD);

        if read_only && request.path() == HEALTH_PATH {
            return Route::Local(self.health());
        }

        if let Err(e) = self.gate.check(&request) {
            return Route::Local(e.to_response());
        }

        if read_only && request.path() == STATUS_PROBE_PATH {
            return Route::Local(Response::ok_json(&ProbeReport { ok: true }));
        }

        if has_dot_segment(request.path()) {
            return Route::Local(GatewayError::InvalidTarget(request.path().to_string()).to_response());
        }

        let Some(target) = backend_target(&request.target, self.proxy.backend()) else {
            return Route::Local(GatewayError::RouteNotFound(request.path().to_string()).to_response());
        };

        debug!(
            path = request.path(),
            query = request.query().unwrap_or_default(),
            backend_target = %target,
            "Rewrote request for backend"
        );

        inject_credential(&mut request.headers, &self.config.backend_api_token);
        request.target = target;
        Route::Forward(request)
    }

    fn health(&self) -> Response {
        Response::ok_json(&HealthReport {
            ok: true,
            backend: &self.config.backend_base_url,
        })
    }
}
