//! Shared-secret gate in front of every non-health route.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::http::request::Request;

/// Result of a gate check that did not reject the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// No token configured; every request passes.
    Disabled,
    /// The request carried the configured token.
    Allowed,
}

#[derive(Debug, Clone)]
pub struct Gate {
    header_name: String,
    token: String,
}

impl Gate {
    pub fn new(header_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into().trim().to_ascii_lowercase(),
            token: token.into().trim().to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.dev_auth_header_name, &config.dev_auth_token)
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Checks `request` against the configured token.
    ///
    /// The presented value is trimmed and must equal the token exactly.
    pub fn check(&self, request: &Request) -> Result<GateOutcome, GatewayError> {
        if !self.is_enabled() {
            debug!(path = request.path(), "Dev auth gate disabled, request bypasses check");
            return Ok(GateOutcome::Disabled);
        }

        let presented = request
            .header(&self.header_name)
            .map(str::trim)
            .unwrap_or_default();

        if !presented.is_empty() && presented == self.token {
            return Ok(GateOutcome::Allowed);
        }

        warn!(
            method = %request.method,
            path = request.path(),
            header = %self.header_name,
            present = !presented.is_empty(),
            "Rejected request at dev auth gate"
        );
        Err(GatewayError::Unauthorized {
            header: self.header_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{Method, RequestBuilder};

    fn request(headers: &[(&str, &str)]) -> Request {
        headers
            .iter()
            .fold(
                RequestBuilder::new().method(Method::GET).target("/bff/providers"),
                |builder, (k, v)| builder.header(*k, *v),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn empty_token_disables_gate() {
        let gate = Gate::new("x-admin-ui-token", "   ");
        assert!(!gate.is_enabled());
        assert_eq!(gate.check(&request(&[])).unwrap(), GateOutcome::Disabled);
    }

    #[test]
    fn header_lookup_ignores_configured_and_sent_case() {
        let gate = Gate::new("X-Admin-UI-Token", "secret123");
        let req = request(&[("X-ADMIN-UI-TOKEN", "  secret123 ")]);
        assert_eq!(gate.check(&req).unwrap(), GateOutcome::Allowed);
    }

    #[test]
    fn missing_blank_or_wrong_value_is_unauthorized() {
        let gate = Gate::new("x-admin-ui-token", "secret123");
        for headers in [
            vec![],
            vec![("x-admin-ui-token", "   ")],
            vec![("x-admin-ui-token", "secret1234")],
            vec![("x-admin-ui-token", "SECRET123")],
            vec![("x-other", "secret123")],
        ] {
            let err = gate.check(&request(&headers)).unwrap_err();
            assert_eq!(err.status_code().as_u16(), 401);
            assert_eq!(err.error_code(), "Unauthorized");
            assert!(err.to_string().contains("x-admin-ui-token"));
        }
    }
}
