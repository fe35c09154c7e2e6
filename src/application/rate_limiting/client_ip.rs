use std::net::IpAddr;

use crate::domain::value_objects::ClientContext;

/// Accepts both `X-Forwarded-For` and the CGI spelling `HTTP_X_FORWARDED_FOR`
fn normalize_header_name(name: &str) -> String {
    let trimmed = name.trim();
    let stripped = trimmed
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("http_"))
        .map_or(trimmed, |_| &trimmed[5..]);
    stripped.replace('_', "-").to_ascii_lowercase()
}

/// Address used as the default rate limit identifier.
///
/// Proxy headers are consulted only when `trusted_headers` is non-empty, in
/// the given order. Only the first comma-separated token of a header is
/// considered, and only if it parses as an IP address. Otherwise the peer
/// address is used, or `0.0.0.0` when unknown.
pub fn resolve_client_ip(client: &ClientContext, trusted_headers: &[String]) -> String {
    for name in trusted_headers {
        let Some(value) = client.header(&normalize_header_name(name)) else {
            continue;
        };
        let first = value.split(',').next().unwrap_or_default().trim();
        if let Ok(ip) = first.parse::<IpAddr>() {
            return ip.to_string();
        }
    }

    client
        .remote_addr()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| ClientContext::UNKNOWN_ADDR.to_string())
}
