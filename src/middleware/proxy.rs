//! Trust-proxy resolution of the client address and scheme.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// How many reverse proxies in front of the server are trusted.
#[derive(Debug, Clone, Copy)]
pub struct TrustProxy {
    pub hops: usize,
}

/// Client address and scheme as seen through trusted proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    /// Best known client address.
    pub ip: Option<IpAddr>,
    /// Whether the client connection is HTTPS.
    pub secure: bool,
}

/// Resolve [`ClientInfo`] and store it in the request extensions.
pub async fn trust_proxy(
    State(trust): State<TrustProxy>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let info = resolve(request.headers(), peer, trust.hops);
    request.extensions_mut().insert(info);

    next.run(request).await
}

/// Walk `X-Forwarded-For` from the right, stepping over at most `hops`
/// trusted proxies.
pub fn resolve(headers: &HeaderMap, peer: Option<IpAddr>, hops: usize) -> ClientInfo {
    if hops == 0 {
        return ClientInfo {
            ip: peer,
            secure: false,
        };
    }

    let forwarded: Vec<IpAddr> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|addr| addr.trim().parse().ok())
        .collect();

    // Nearest hop first: the peer itself, then forwarded entries right to left.
    let chain: Vec<IpAddr> = peer
        .into_iter()
        .chain(forwarded.into_iter().rev())
        .collect();
    let ip = chain.get(hops.min(chain.len().saturating_sub(1))).copied();

    let secure = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

    ClientInfo { ip, secure }
}
