//! Session tokens for the HTTP and WebSocket surfaces.
//!
//! A token is the character-interleaved weave of three SHA-256 hex digests:
//! client IP, user id, and username. The server stores the weave at login
//! and recomputes it on each check, so a token is only valid from the
//! address it was issued to. Sessions expire 3 days after issuance.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

/// Sessions expire this many days after login.
pub const SESSION_TTL_DAYS: i64 = 3;

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Interleave three equal-length hex digests character by character.
fn weave(a: &str, b: &str, c: &str) -> String {
    let mut woven = String::with_capacity(a.len() + b.len() + c.len());
    for ((x, y), z) in a.chars().zip(b.chars()).zip(c.chars()) {
        woven.push(x);
        woven.push(y);
        woven.push(z);
    }
    woven
}

/// Build the session token for a (client IP, user, username) triple.
pub fn session_token(ip: &str, user_id: i64, username: &str) -> String {
    let ip_hash = sha256_hex(ip);
    let user_id_hash = sha256_hex(&user_id.to_string());
    let username_hash = sha256_hex(username);
    weave(&ip_hash, &user_id_hash, &username_hash)
}

/// Expiry timestamp for a session issued now.
pub fn session_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(SESSION_TTL_DAYS)
}

/// Resolve the client IP: X-Forwarded-For when present (first hop),
/// otherwise the peer address. IPv6 loopback is normalized to 127.0.0.1
/// so tokens issued over localhost survive the v4/v6 split.
pub fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let ip = forwarded.unwrap_or_else(|| addr.ip().to_string());
    if ip == "::1" {
        "127.0.0.1".to_string()
    } else {
        ip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_deterministic() {
        let a = session_token("127.0.0.1", 42, "alice");
        let b = session_token("127.0.0.1", 42, "alice");
        assert_eq!(a, b);
        // Three interleaved 64-char digests
        assert_eq!(a.len(), 192);
    }

    #[test]
    fn test_token_binds_all_parts() {
        let base = session_token("127.0.0.1", 42, "alice");
        assert_ne!(base, session_token("10.0.0.1", 42, "alice"));
        assert_ne!(base, session_token("127.0.0.1", 43, "alice"));
        assert_ne!(base, session_token("127.0.0.1", 42, "bob"));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, &addr), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_normalizes_v6_loopback() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "[::1]:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, &addr), "127.0.0.1");
    }
}
