//! URL validation, normalization, and canonicalization.
//!
//! Every URL stored or compared by the engine goes through [`canonicalize`]:
//! scheme and host lowercased, default ports stripped, fragments removed,
//! dot segments resolved, query preserved. The parsers in the `url` crate
//! implement the first four; this module layers fragment removal, scheme
//! filtering, and a length cap on top.

use log::warn;
use psl::Psl;
use url::Url;

use crate::config::MAX_URL_LENGTH;

/// Validates and normalizes a seed URL given on the command line or by a
/// caller.
///
/// Adds an `https://` prefix if no scheme is present, then canonicalizes.
/// Logs a warning and returns `None` if the URL is invalid, too long, or
/// uses an unsupported scheme.
pub fn validate_and_normalize_url(url: &str) -> Option<String> {
    if url.len() > MAX_URL_LENGTH {
        let prefix: String = url.chars().take(50).collect();
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {prefix}...",
            url.len(),
            MAX_URL_LENGTH,
        );
        return None;
    }

    let prefixed = if !url.starts_with("http://") && !url.starts_with("https://") {
        format!("https://{url}")
    } else {
        url.to_string()
    };

    if prefixed.len() > MAX_URL_LENGTH {
        warn!("Skipping URL exceeding maximum length after normalization: {url}");
        return None;
    }

    match canonicalize(&prefixed, None) {
        Some(parsed) => Some(parsed.to_string()),
        None => {
            warn!("Skipping invalid URL: {url}");
            None
        }
    }
}

/// Canonicalizes a URL, optionally resolving it against a base.
///
/// Returns `None` for malformed URLs, non-http(s) schemes, URLs without a
/// host, and URLs longer than the engine cap. The returned `Url` has its
/// fragment removed; the `url` crate's parser already lowercases scheme
/// and host, strips default ports, and resolves dot segments. The query
/// string is preserved.
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Option<Url> {
    let mut parsed = match base {
        Some(b) => b.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str()?;

    parsed.set_fragment(None);

    if parsed.as_str().len() > MAX_URL_LENGTH {
        return None;
    }

    Some(parsed)
}

/// Canonical string form used as the key in all engine maps and tables.
pub fn canonical_string(raw: &str, base: Option<&Url>) -> Option<String> {
    canonicalize(raw, base).map(|u| u.to_string())
}

/// True when both URLs share scheme-relevant origin: host and effective
/// port. Used for the BFS same-origin rule.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Extracts the registrable domain of a URL's host via the Public Suffix
/// List. Hosts without a registrable suffix (IP addresses, localhost) fall
/// back to the raw host string.
pub fn registrable_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match psl::List.domain(host.as_bytes()) {
        Some(d) => Some(String::from_utf8_lossy(d.as_bytes()).to_string()),
        None => Some(host.to_string()),
    }
}

/// True when `url`'s registrable host differs from the seed's.
pub fn is_external(url: &Url, seed: &Url) -> bool {
    match (registrable_host(url), registrable_host(seed)) {
        (Some(a), Some(b)) => !a.eq_ignore_ascii_case(&b),
        _ => url.host_str() != seed.host_str(),
    }
}

/// File extensions that classify a URL as a resource link.
const RESOURCE_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".xml", ".json", ".txt", ".csv", ".jpg", ".jpeg", ".png", ".gif", ".svg",
    ".webp", ".ico", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".pdf", ".doc", ".docx", ".xls",
    ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".tar", ".gz", ".mp3", ".mp4", ".avi", ".mov",
    ".wav", ".wmv",
];

/// True when the URL path ends in a known resource file extension.
pub fn has_resource_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    RESOURCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
