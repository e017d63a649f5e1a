//! Who is calling, and from which public origin.
//!
//! The peer address comes from axum's `ConnectInfo`. Behind one reverse proxy
//! (`trust_proxy`), the last `X-Forwarded-For` hop and `X-Forwarded-Proto`
//! win instead.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::http::request::Parts;

use crate::app::ServerConfig;
use crate::state::ServerState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Client address, if it can be determined.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl FromRequestParts<ServerState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(parts, state.config.trust_proxy)))
    }
}

pub fn client_ip(parts: &Parts, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy && let Some(ip) = forwarded_for(&parts.headers) {
        return Some(ip);
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .rsplit(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Base URL the client used to reach us, without a trailing slash.
pub fn request_origin(headers: &HeaderMap, config: &ServerConfig) -> String {
    if let Some(url) = &config.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let proto = config
        .trust_proxy
        .then(|| headers.get(X_FORWARDED_PROTO))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| config.bind_addr());

    format!("{proto}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)], peer: Option<SocketAddr>) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(()).unwrap();
        if let Some(peer) = peer {
            request.extensions_mut().insert(ConnectInfo(peer));
        }
        request.into_parts().0
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 7], 50123))
    }

    #[test]
    fn test_peer_address_used_by_default() {
        let parts = parts(&[(X_FORWARDED_FOR, "1.2.3.4")], Some(peer()));
        assert_eq!(client_ip(&parts, false), Some(peer().ip()));
    }

    #[test]
    fn test_forwarded_for_last_hop_when_trusted() {
        let parts = parts(&[(X_FORWARDED_FOR, "6.6.6.6, 1.2.3.4")], Some(peer()));
        assert_eq!(client_ip(&parts, true), Some("1.2.3.4".parse().unwrap()));
    }

    #[test]
    fn test_bad_forwarded_for_falls_back_to_peer() {
        let parts = parts(&[(X_FORWARDED_FOR, "garbage")], Some(peer()));
        assert_eq!(client_ip(&parts, true), Some(peer().ip()));
    }

    #[test]
    fn test_no_address_known() {
        let parts = parts(&[], None);
        assert_eq!(client_ip(&parts, true), None);
    }

    #[test]
    fn test_origin_from_host_header() {
        let config = ServerConfig::default();
        let parts = parts(&[("host", "polls.example.com")], None);
        assert_eq!(
            request_origin(&parts.headers, &config),
            "http://polls.example.com"
        );
    }

    #[test]
    fn test_origin_honors_forwarded_proto_only_when_trusted() {
        let parts = parts(
            &[("host", "polls.example.com"), (X_FORWARDED_PROTO, "https")],
            None,
        );

        let config = ServerConfig::default();
        assert!(request_origin(&parts.headers, &config).starts_with("http://"));

        let config = ServerConfig {
            trust_proxy: true,
            ..ServerConfig::default()
        };
        assert_eq!(
            request_origin(&parts.headers, &config),
            "https://polls.example.com"
        );
    }

    #[test]
    fn test_public_url_overrides() {
        let config = ServerConfig {
            public_url: Some("https://vote.example.org/".into()),
            ..ServerConfig::default()
        };
        let parts = parts(&[("host", "internal:3000")], None);
        assert_eq!(
            request_origin(&parts.headers, &config),
            "https://vote.example.org"
        );
    }
}
