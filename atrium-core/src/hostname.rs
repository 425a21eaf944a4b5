//! Hostname normalization shared by the tenant store and the resolution cache.
//!
//! Both sides of a lookup go through [`normalize_host`], so a tenant that
//! registered `Clinic.Test` is still found for a request to `clinic.test:443`.

const WWW_PREFIX: &str = "www.";

/// Remove a trailing `:port` suffix.
///
/// Bracketed IPv6 literals (`[::1]:8080`) keep their inner colons; a bare
/// value with more than one colon is left alone since it cannot carry a port.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}

/// Canonical form used as a cache key: port stripped, trimmed, one trailing
/// dot removed, ASCII-lowercased.
pub fn normalize_host(host: &str) -> String {
    let host = strip_port(host.trim());
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}

/// Normalized domain with a single leading `www.` removed.
pub fn bare_domain(domain: &str) -> String {
    let normalized = normalize_host(domain);
    match normalized.strip_prefix(WWW_PREFIX) {
        Some(bare) => bare.to_string(),
        None => normalized,
    }
}

/// The two hostnames a tenant domain answers to: bare and `www.`-prefixed.
///
/// Returns `None` for domains that normalize to nothing.
pub fn domain_keys(domain: &str) -> Option<[String; 2]> {
    let bare = bare_domain(domain);
    if bare.is_empty() {
        return None;
    }
    let www = format!("{}{}", WWW_PREFIX, bare);
    Some([bare, www])
}
