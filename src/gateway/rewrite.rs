use url::Url;

/// Path prefix the browser uses for backend calls.
pub const FORWARD_PREFIX: &str = "/bff";

/// Backend path segment that replaces [`FORWARD_PREFIX`].
pub const BACKEND_SEGMENT: &str = "/api/public";

/// Returns what follows [`FORWARD_PREFIX`] in `target`, query included, if
/// `target` falls under the prefix.
///
/// The prefix only matches on a segment boundary: `/bff`, `/bff/...` and
/// `/bff?...` match, `/bffx` does not.
pub fn strip_forward_prefix(target: &str) -> Option<&str> {
    let rest = target.strip_prefix(FORWARD_PREFIX)?;
    match rest.as_bytes().first() {
        None | Some(b'/') | Some(b'?') => Some(rest),
        _ => None,
    }
}

/// Whether `path` has a `.` or `..` segment, percent-encoded dots included.
///
/// Such targets could climb out of the backend segment once the backend
/// normalises them, so they are never forwarded.
pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Maps a client request-target onto the backend.
///
/// `/bff/S?Q` becomes `<base path>/api/public/S?Q`, where `<base path>` is
/// whatever path the backend base URL carries (usually empty). The suffix
/// and query are copied byte-for-byte.
pub fn backend_target(target: &str, backend: &Url) -> Option<String> {
    let rest = strip_forward_prefix(target)?;
    let base = backend.path().trim_end_matches('/');
    Some(format!("{base}{BACKEND_SEGMENT}{rest}"))
}
