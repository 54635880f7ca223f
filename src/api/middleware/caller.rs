//! Caller identity extraction for rate limiting

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::api::state::AppState;

const ANONYMOUS: &str = "anonymous";

/// Which client-supplied headers may name the caller
///
/// Both flags are off by default, so the peer socket address is the identity.
/// Enable them only behind a proxy or auth layer that overwrites the headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallerPolicy {
    /// Honour `X-Forwarded-For` and `X-Real-IP`
    pub trust_proxy_headers: bool,
    /// Honour `X-Account-Id`
    pub trust_account_header: bool,
}

/// Identity the admission gate accounts requests against
///
/// Resolved from, in order:
/// - `X-Account-Id` header, when trusted
/// - first hop of `X-Forwarded-For`, then `X-Real-IP`, when trusted
/// - peer socket address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(CallerIdentity(resolve_identity(
            &parts.headers,
            peer,
            state.caller_policy,
        )))
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn resolve_identity(headers: &HeaderMap, peer: Option<SocketAddr>, policy: CallerPolicy) -> String {
    if policy.trust_account_header {
        if let Some(account) = header_value(headers, "x-account-id") {
            return format!("account:{}", account);
        }
    }

    if policy.trust_proxy_headers {
        let forwarded = header_value(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded.or_else(|| header_value(headers, "x-real-ip")) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}
