use tracing::debug;

use crate::http::headers::HeaderMap;

/// Header the backend reads its credential from. Not configurable.
pub const CREDENTIAL_HEADER: &str = "auth-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// The caller sent a non-blank credential; it is forwarded untouched.
    CallerSupplied,
    /// The server-side token was set on the request.
    Injected,
    /// No caller credential and no server-side token.
    Skipped,
}

/// Sets `auth-token` to `server_token` unless the caller already sent a
/// non-blank value.
///
/// A caller-supplied value always wins. An empty `server_token` never adds
/// the header.
pub fn inject_credential(headers: &mut HeaderMap, server_token: &str) -> Injection {
    let caller_supplied = headers
        .get(CREDENTIAL_HEADER)
        .is_some_and(|v| !v.trim().is_empty());

    if caller_supplied {
        debug!("Forwarding caller-supplied {}", CREDENTIAL_HEADER);
        return Injection::CallerSupplied;
    }

    if server_token.is_empty() {
        return Injection::Skipped;
    }

    headers.insert(CREDENTIAL_HEADER, server_token);
    debug!("Injected server-side {}", CREDENTIAL_HEADER);
    Injection::Injected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_when_absent() {
        let mut headers = HeaderMap::new();
        assert_eq!(inject_credential(&mut headers, "bk-tok"), Injection::Injected);
        assert_eq!(headers.get("auth-token"), Some("bk-tok"));
    }

    #[test]
    fn replaces_blank_caller_value() {
        let mut headers: HeaderMap = [("Auth-Token", "  ")].into_iter().collect();
        assert_eq!(inject_credential(&mut headers, "bk-tok"), Injection::Injected);
        assert_eq!(headers.get_all("auth-token").collect::<Vec<_>>(), vec!["bk-tok"]);
    }

    #[test]
    fn caller_value_is_never_overridden() {
        let mut headers: HeaderMap = [("AUTH-TOKEN", "user-tok")].into_iter().collect();
        assert_eq!(
            inject_credential(&mut headers, "bk-tok"),
            Injection::CallerSupplied
        );
        assert_eq!(headers.get("auth-token"), Some("user-tok"));
    }

    #[test]
    fn nothing_added_without_server_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(inject_credential(&mut headers, ""), Injection::Skipped);
        assert!(!headers.contains("auth-token"));
    }
}
