//! Turning an HTTP request into [`Credentials`].

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, header::AUTHORIZATION, request::Parts};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gatehouse_core::auth::Credentials;

use crate::models::TokenRequest;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Decode an `Authorization: Basic` header into username and password.
pub fn decode_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Whether `header` looks like an `X-Forwarded-For` list: IP addresses
/// separated by `", "`. The header is client-controlled, so anything else
/// is ignored rather than logged.
fn is_forwarded_for_list(header: &str) -> bool {
    !header.is_empty()
        && header
            .split(", ")
            .all(|entry| entry.parse::<IpAddr>().is_ok())
}

/// Client address for logging. A well-formed `X-Forwarded-For` chain is
/// included ahead of the peer address.
pub fn loggable_address(peer: Option<IpAddr>, headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_forwarded_for_list(h));

    match (forwarded, peer) {
        (Some(chain), Some(peer)) => Some(format!("[{chain}, {peer}]")),
        (Some(chain), None) => Some(format!("[{chain}]")),
        (None, Some(peer)) => Some(peer.to_string()),
        (None, None) => None,
    }
}

/// Loggable client address, available whether or not the server was started
/// with connect info.
#[derive(Debug, Clone, Default)]
pub struct ClientAddress(pub Option<String>);

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientAddress(loggable_address(peer, &parts.headers)))
    }
}

/// Credentials for a token request. Form fields win; a Basic header is only
/// consulted when neither username nor password was posted.
pub fn credentials_from_request(
    form: &TokenRequest,
    headers: &HeaderMap,
    address: ClientAddress,
) -> Credentials {
    let (username, password) = match (&form.username, &form.password) {
        (None, None) => match decode_basic(headers) {
            Some((u, p)) => (Some(u), Some(p)),
            None => (None, None),
        },
        (u, p) => (u.clone(), p.clone()),
    };

    Credentials {
        username,
        password,
        remote_addr: address.0,
    }
}
