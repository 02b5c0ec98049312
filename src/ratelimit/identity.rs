//! Caller identity derivation.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// The partition key for rate limiting.
///
/// Derived from client-supplied or connection-level address info. The value
/// is not globally unique across proxies; it is only used to partition rate
/// limit windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Derive the caller identity from request headers and the peer address.
    ///
    /// Precedence: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
    /// direct peer address. Falls back to `"unknown"` when none is available.
    pub fn derive(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Self(first.to_string());
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            let real_ip = real_ip.trim();
            if !real_ip.is_empty() {
                return Self(real_ip.to_string());
            }
        }

        match peer {
            Some(addr) => Self(addr.ip().to_string()),
            None => Self("unknown".to_string()),
        }
    }

    /// The counter store key for this identity's window record.
    pub fn store_key(&self) -> String {
        format!("rate_limit:{}", self.0)
    }

    /// The raw identity value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:43210".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));

        let identity = CallerIdentity::derive(&headers, peer());
        assert_eq!(identity.as_str(), "203.0.113.9");
    }

    #[test]
    fn test_forwarded_for_uses_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1, 10.0.0.2"),
        );

        let identity = CallerIdentity::derive(&headers, peer());
        assert_eq!(identity.as_str(), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));

        let identity = CallerIdentity::derive(&headers, peer());
        assert_eq!(identity.as_str(), "198.51.100.1");
    }

    #[test]
    fn test_peer_address_fallback() {
        let identity = CallerIdentity::derive(&HeaderMap::new(), peer());
        assert_eq!(identity.as_str(), "192.0.2.7");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        let identity = CallerIdentity::derive(&HeaderMap::new(), None);
        assert_eq!(identity.as_str(), "unknown");
    }

    #[test]
    fn test_store_key_format() {
        let identity = CallerIdentity::derive(&HeaderMap::new(), peer());
        assert_eq!(identity.store_key(), "rate_limit:192.0.2.7");
    }
}
